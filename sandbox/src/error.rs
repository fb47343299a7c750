//! Facade-level error taxonomy. Individual component crates keep their own
//! `thiserror` enums (`spec.md` §7); this crate aggregates across them at
//! the embedder boundary, so it reaches for `anyhow` the way
//! `snowflake-actions`/`snowflake-core` do at their own aggregation
//! boundary (SPEC_FULL.md §7, §10.1).

#[derive(Debug, thiserror::Error)]
pub enum Error
{
    /// Any call made on a [`crate::Sandbox`] after [`crate::Sandbox::destroy`]
    /// (`spec.md` §4.10: "all further calls fail with `Sandbox destroyed`").
    #[error("Sandbox destroyed")]
    Destroyed,
    #[error(transparent)]
    Vfs(#[from] sandbox_vfs::Error),
    #[error(transparent)]
    Net(#[from] sandbox_net::Error),
    #[error(transparent)]
    Persist(#[from] sandbox_persist::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
