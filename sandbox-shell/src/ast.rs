//! Shell abstract syntax tree (`spec.md` §3.1, §4.4).

/// How a [`WordPart`] was quoted when lexed; governs which expansions
/// apply to it later (`spec.md` §4.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Quoting
{
    /// Unquoted: tilde, variable, command substitution, and glob all
    /// apply.
    None,
    /// Single-quoted: the text is emitted literally.
    Single,
    /// Double-quoted: variable and command substitution apply; no glob,
    /// no tilde.
    Double,
}

/// One fragment of a [`Word`], tagged with the quoting it was lexed
/// under.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WordPart
{
    /// The fragment's raw text (unescaped of the quote characters
    /// themselves, but not yet expanded).
    pub text: String,
    /// How this fragment was quoted.
    pub quoting: Quoting,
}

/// A shell word: an ordered sequence of differently-quoted fragments,
/// concatenated before expansion (`spec.md` §3.1).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Word(pub Vec<WordPart>);

impl Word
{
    /// A word consisting of a single unquoted literal fragment.
    pub fn literal(text: impl Into<String>) -> Self
    {
        Word(vec![WordPart { text: text.into(), quoting: Quoting::None }])
    }

    /// Whether every fragment of this word is unquoted (eligible for
    /// tilde expansion and globbing).
    pub fn is_fully_unquoted(&self) -> bool
    {
        self.0.iter().all(|p| p.quoting == Quoting::None)
    }
}

/// A redirection operator (`spec.md` §3.1, §4.6).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RedirOp
{
    /// `>` truncate-write to stdout.
    Write,
    /// `>>` append to stdout.
    Append,
    /// `<` read from stdin.
    Read,
    /// `2>` truncate-write to stderr.
    ErrWrite,
    /// `2>>` append to stderr.
    ErrAppend,
    /// `&>` truncate-write both stdout and stderr.
    Both,
}

/// One redirection attached to a [`Simple`] command.
#[derive(Clone, Debug)]
pub struct Redirection
{
    /// The redirection operator.
    pub op: RedirOp,
    /// The target file, expanded in a single-valued context.
    pub target: Word,
}

/// A simple command: `(assignment)* (word)+ (redirection)*`, or all
/// assignments with no words (`spec.md` §4.4).
#[derive(Clone, Debug, Default)]
pub struct Simple
{
    /// Leading `NAME=value` assignments.
    pub assignments: Vec<(String, Word)>,
    /// The command name (first word) and its arguments.
    pub words: Vec<Word>,
    /// Redirections, applied after expansion, before invocation.
    pub redirections: Vec<Redirection>,
}

/// One `pattern | pattern ...) body ;;` arm of a `case` statement.
#[derive(Clone, Debug)]
pub struct CaseArm
{
    /// Alternative patterns for this arm; a match against any selects it.
    pub patterns: Vec<Word>,
    /// The arm's body.
    pub body: CompoundList,
}

/// One `if`/`elif` branch: a condition and its body.
#[derive(Clone, Debug)]
pub struct IfBranch
{
    /// The branch's condition.
    pub condition: CompoundList,
    /// The branch's body, run if the condition's exit code is 0.
    pub body: CompoundList,
}

/// A command (`spec.md` §3.1, §4.4): a tagged variant, not an open
/// hierarchy (`spec.md` §9).
#[derive(Clone, Debug)]
pub enum Command
{
    /// A simple command invocation.
    Simple(Simple),
    /// `if`/`elif`/`else`/`fi`.
    If
    {
        /// `if` followed by any `elif` branches, in order.
        branches: Vec<IfBranch>,
        /// The `else` body, if present.
        else_branch: Option<CompoundList>,
    },
    /// `for NAME [in words] ; do ... done`.
    For
    {
        /// The loop variable's name.
        variable: String,
        /// The words to iterate over. `None` means "iterate over the
        /// positional parameters" (bash's default when `in` is omitted).
        words: Option<Vec<Word>>,
        /// The loop body.
        body: CompoundList,
    },
    /// `while ... do ... done`.
    While
    {
        /// The loop condition, re-evaluated before each iteration.
        condition: CompoundList,
        /// The loop body.
        body: CompoundList,
    },
    /// `until ... do ... done`.
    Until
    {
        /// The loop condition, re-evaluated before each iteration.
        condition: CompoundList,
        /// The loop body.
        body: CompoundList,
    },
    /// `case word in pattern) ... ;; esac`.
    Case
    {
        /// The word matched against each arm's patterns.
        word: Word,
        /// The arms, tried in order; the first match wins.
        arms: Vec<CaseArm>,
    },
    /// `NAME() command`: defines a function.
    FunctionDef
    {
        /// The function's name.
        name: String,
        /// The function's body.
        body: Box<Command>,
    },
    /// `{ compound-list }`: a group run in the current shell environment.
    Group(CompoundList),
}

/// A pipeline: `['!'] command ('|' command)*` (`spec.md` §3.1, §4.4).
#[derive(Clone, Debug)]
pub struct Pipeline
{
    /// The pipeline's stages, executed left to right.
    pub commands: Vec<Command>,
    /// Whether the pipeline's exit code is logically negated (`!`).
    pub negated: bool,
}

/// How two pipelines in a [`List`] are connected (`spec.md` §3.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Connector
{
    /// `;`: run unconditionally.
    Semi,
    /// `&&`: run only if the previous pipeline exited 0.
    And,
    /// `||`: run only if the previous pipeline exited non-zero.
    Or,
}

/// A chain of pipelines connected by `&&`/`||`, optionally backgrounded
/// (`spec.md` §3.1, §4.4).
#[derive(Clone, Debug)]
pub struct List
{
    /// The first pipeline.
    pub first: Pipeline,
    /// Subsequent pipelines, each with the connector joining it to the
    /// one before it.
    pub rest: Vec<(Connector, Pipeline)>,
    /// Whether this list was terminated with `&` (run in the background).
    pub background: bool,
}

/// An ordered sequence of [`List`]s: the body of a script or of a
/// compound command (`spec.md` §3.1, Glossary).
#[derive(Clone, Debug, Default)]
pub struct CompoundList(pub Vec<List>);

/// A whole parsed script (`spec.md` §3.1).
#[derive(Clone, Debug, Default)]
pub struct Script(pub CompoundList);
