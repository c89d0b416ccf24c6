//! Structured PowerShell command lines.
//!
//! A [`Command`] is a cmdlet name plus an ordered list of typed clauses.
//! Rendering follows the PowerShell conventions the Hyper-V cmdlets parse:
//!
//! - strings are double-quoted with back-tick escaping
//! - booleans are `$True` / `$False`
//! - switch parameters with an explicit value use `-Name:$True`
//! - queries may end in `| ConvertTo-Json`
//!
//! ```
//! use pwshkit::Command;
//!
//! let cmd = Command::new("Get-VMSwitch").arg("Name", "LAN").to_json();
//! assert_eq!(cmd.to_string(), r#"Get-VMSwitch -Name "LAN" | ConvertTo-Json"#);
//! ```

use std::fmt;

/// Render a PowerShell boolean literal
pub fn bool_literal(value: bool) -> &'static str {
    if value { "$True" } else { "$False" }
}

/// Render a double-quoted PowerShell string
///
/// Back-ticks, double quotes and dollar signs are escaped with a back-tick
/// so the value is never interpolated.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '`' | '"' | '$') {
            out.push('`');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// A single clause of a command line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    /// `"value"` with no parameter name
    Positional(String),
    /// `-Name "value"`
    Quoted(String, String),
    /// `-Name value`, value written verbatim
    Raw(String, String),
    /// `-Name`
    Flag(String),
    /// `-Name $True`
    Bool(String, bool),
    /// `-Name:$True`
    Switch(String, bool),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(value) => write!(f, "{}", quote(value)),
            Self::Quoted(name, value) => write!(f, "-{} {}", name, quote(value)),
            Self::Raw(name, value) => write!(f, "-{} {}", name, value),
            Self::Flag(name) => write!(f, "-{}", name),
            Self::Bool(name, value) => write!(f, "-{} {}", name, bool_literal(*value)),
            Self::Switch(name, value) => write!(f, "-{}:{}", name, bool_literal(*value)),
        }
    }
}

/// A PowerShell command line built from ordered clauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cmdlet: String,
    clauses: Vec<Clause>,
    property: Option<String>,
    json: bool,
}

impl Command {
    pub fn new(cmdlet: impl Into<String>) -> Self {
        Self {
            cmdlet: cmdlet.into(),
            clauses: Vec::new(),
            property: None,
            json: false,
        }
    }

    /// Append an unnamed, quoted argument
    pub fn positional(mut self, value: impl Into<String>) -> Self {
        self.clauses.push(Clause::Positional(value.into()));
        self
    }

    /// Append `-name "value"`
    pub fn arg(mut self, name: &str, value: impl Into<String>) -> Self {
        self.clauses.push(Clause::Quoted(name.to_string(), value.into()));
        self
    }

    /// Append `-name "value"` when `value` is set
    pub fn arg_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.arg(name, value),
            None => self,
        }
    }

    /// Append `-name value` without quoting (enum members, sub-expressions)
    pub fn raw(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.clauses
            .push(Clause::Raw(name.to_string(), value.to_string()));
        self
    }

    /// Append `-name` with no value
    pub fn flag(mut self, name: &str) -> Self {
        self.clauses.push(Clause::Flag(name.to_string()));
        self
    }

    /// Append `-name $True` / `-name $False`
    pub fn bool(mut self, name: &str, value: bool) -> Self {
        self.clauses.push(Clause::Bool(name.to_string(), value));
        self
    }

    /// Append `-name:$True` / `-name:$False`
    pub fn switch(mut self, name: &str, value: bool) -> Self {
        self.clauses.push(Clause::Switch(name.to_string(), value));
        self
    }

    /// Append `-name:$value` when `value` is set
    pub fn switch_opt(self, name: &str, value: Option<bool>) -> Self {
        match value {
            Some(value) => self.switch(name, value),
            None => self,
        }
    }

    /// Select a property of the result: `(cmd).Property`
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.property = Some(name.into());
        self
    }

    /// Pipe the result through `ConvertTo-Json`
    pub fn to_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn cmdlet(&self) -> &str {
        &self.cmdlet
    }

    /// Number of clauses after the cmdlet name
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = self.cmdlet.clone();
        for clause in &self.clauses {
            line.push(' ');
            line.push_str(&clause.to_string());
        }
        if let Some(property) = &self.property {
            line = format!("({}).{}", line, property);
        }
        write!(f, "{}", line)?;
        if self.json {
            write!(f, " | ConvertTo-Json")?;
        }
        Ok(())
    }
}
