//! Shell variable and positional-parameter storage (`spec.md` §3.1,
//! §4.6 "Environment & assignments", §6.1).

use std::collections::HashMap;

/// The shell's variable table, positional parameters, and last exit
/// code. Owned by the interpreter; the expander borrows it read-only.
#[derive(Clone)]
pub struct Environment
{
    vars: HashMap<String, String>,
    exported: std::collections::HashSet<String>,
    positional: Vec<String>,
    pub last_exit_code: i32,
    pub cwd: String,
    /// `$0`: the shell's own invocation name.
    pub shell_name: String,
}

impl Environment
{
    pub fn new(cwd: impl Into<String>) -> Self
    {
        let cwd = cwd.into();
        let mut vars = HashMap::new();
        vars.insert("PWD".to_string(), cwd.clone());
        vars.insert("HOME".to_string(), "/home/user".to_string());
        vars.insert("USER".to_string(), "user".to_string());
        vars.insert("HOSTNAME".to_string(), "sandbox".to_string());
        vars.insert("PATH".to_string(), "/bin:/usr/bin".to_string());
        Self {
            vars,
            exported: std::collections::HashSet::new(),
            positional: Vec::new(),
            last_exit_code: 0,
            cwd,
            shell_name: "sh".to_string(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str>
    {
        match name {
            "?" => None, // handled by caller via last_exit_code (needs formatting)
            "#" => None,
            "@" | "*" => None,
            "0" => Some(self.shell_name.as_str()),
            "$" => None,
            _ if name.chars().all(|c| c.is_ascii_digit()) => {
                let idx: usize = name.parse().ok()?;
                self.positional.get(idx.wrapping_sub(1)).map(|s| s.as_str())
            },
            _ => self.vars.get(name).map(|s| s.as_str()),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>)
    {
        let value = value.into();
        if name == "PWD" {
            self.cwd = value.clone();
        }
        self.vars.insert(name.to_string(), value);
    }

    pub fn unset(&mut self, name: &str)
    {
        self.vars.remove(name);
        self.exported.remove(name);
    }

    pub fn export(&mut self, name: &str)
    {
        self.exported.insert(name.to_string());
    }

    pub fn is_exported(&self, name: &str) -> bool
    {
        self.exported.contains(name)
    }

    /// A snapshot suitable for handing to a spawned process
    /// (`sandbox-process::Spawn::env`) or for `export` with no
    /// arguments to list.
    pub fn exported_snapshot(&self) -> HashMap<String, String>
    {
        self.exported.iter().filter_map(|n| self.vars.get(n).map(|v| (n.clone(), v.clone()))).collect()
    }

    pub fn all_snapshot(&self) -> HashMap<String, String>
    {
        self.vars.clone()
    }

    pub fn positional(&self) -> &[String]
    {
        &self.positional
    }

    pub fn set_positional(&mut self, args: Vec<String>)
    {
        self.positional = args;
    }

    pub fn positional_count(&self) -> usize
    {
        self.positional.len()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn positional_parameters_are_one_indexed()
    {
        let mut env = Environment::new("/");
        env.set_positional(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(env.get("1"), Some("a"));
        assert_eq!(env.get("2"), Some("b"));
        assert_eq!(env.get("3"), None);
    }
}
