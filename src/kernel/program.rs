use std::{collections::HashMap, fmt, sync::Arc};

use crate::{kernel::launcher::LaunchError, library::Library};

/// A program's main function: gets a syscall handle and its arguments,
/// returns its exit code.
pub type Entry = Arc<dyn Fn(&Library, &[String]) -> i32 + Send + Sync>;

/// Names the kernel can launch, filled in at startup.
///
/// A name can also be declared without an entry point; launching it fails
/// with [`LaunchError::NoEntryPoint`] instead of [`LaunchError::NoSuchProgram`].
#[derive(Clone, Default)]
pub struct ProgramRegistry {
    programs: HashMap<String, Option<Entry>>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, entry: F) -> &mut Self
    where
        F: Fn(&Library, &[String]) -> i32 + Send + Sync + 'static,
    {
        self.programs.insert(name.into(), Some(Arc::new(entry)));
        self
    }

    pub fn declare(&mut self, name: impl Into<String>) -> &mut Self {
        self.programs.insert(name.into(), None);
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Entry, LaunchError> {
        match self.programs.get(name) {
            Some(Some(entry)) => Ok(Arc::clone(entry)),
            Some(None) => Err(LaunchError::NoEntryPoint(name.to_string())),
            None => Err(LaunchError::NoSuchProgram(name.to_string())),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.programs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ProgramRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramRegistry")
            .field("programs", &self.names())
            .finish()
    }
}
