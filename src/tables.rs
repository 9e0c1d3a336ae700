//! Function and source-variable tables gathered alongside the types.

use indexmap::IndexMap;

use crate::model::TypeId;

/// A subprogram with a known address range.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Function {
    pub name: String,
    /// Entry address, as recorded in the debug info (not relocated).
    pub low: u64,
    /// One past the last address.
    pub high: u64,
}

/// Ordered list of functions, used to turn function pointer values back into
/// names.
#[derive(Clone, Debug, Default)]
pub struct FunctionTable {
    functions: Vec<Function>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn push(&mut self, f: Function) {
        self.functions.push(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> + '_ {
        self.functions.iter()
    }

    /// Finds the first function whose entry point, relocated by `base`, is
    /// exactly `addr`.
    pub fn find_entry(&self, addr: u64, base: u64) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.low.wrapping_add(base) == addr)
    }

    /// Finds the first function whose relocated range contains `addr`.
    pub fn find_containing(&self, addr: u64, base: u64) -> Option<&Function> {
        self.functions.iter().find(|f| {
            f.low.wrapping_add(base) <= addr && addr < f.high.wrapping_add(base)
        })
    }
}

/// A variable or parameter declaration with a source location.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceVariable {
    pub name: String,
    /// Declaring file as recorded in the line program; empty if the file
    /// index could not be resolved.
    pub file: String,
    pub line: u64,
    pub type_id: Option<TypeId>,
}

/// Why a call-site lookup produced no type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SiteLookupError {
    /// No compile unit is associated with the file.
    UnknownFile,
    /// The compile unit has no marker variable at or before the line.
    NoMarker,
}

/// Per-compile-unit declarations, in the order they appear in the debug
/// info.
#[derive(Clone, Debug, Default)]
pub struct SourceVariableIndex {
    units: IndexMap<String, Vec<SourceVariable>>,
}

impl SourceVariableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded declarations.
    pub fn len(&self) -> usize {
        self.units.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.units.values().all(Vec::is_empty)
    }

    pub fn push(&mut self, unit: &str, var: SourceVariable) {
        if let Some(vars) = self.units.get_mut(unit) {
            vars.push(var);
        } else {
            self.units.insert(unit.to_string(), vec![var]);
        }
    }

    pub fn units(&self) -> impl Iterator<Item = (&str, &[SourceVariable])> + '_ {
        self.units.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Finds the compile unit that owns `file`: first by exact name, then by
    /// either name being a path suffix of the other.
    pub fn unit_for_file(&self, file: &str) -> Option<&[SourceVariable]> {
        if let Some(vars) = self.units.get(file) {
            return Some(vars);
        }
        self.units
            .iter()
            .filter(|(unit, _)| !unit.is_empty())
            .find(|(unit, _)| unit.ends_with(file) || file.ends_with(unit.as_str()))
            .map(|(_, vars)| vars.as_slice())
    }

    /// Recovers the type of the marker variable most recently declared at or
    /// before `file:line`.
    ///
    /// The owning compile unit is searched first. When no unit is known by
    /// that name (Rust names its units after the crate root), every unit is
    /// scanned instead.
    pub fn find_marker(
        &self,
        marker: &str,
        file: &str,
        line: u64,
    ) -> Result<Option<TypeId>, SiteLookupError> {
        let found = match self.unit_for_file(file) {
            Some(vars) => last_marker(vars, marker, file, line),
            None => {
                let mut known_file = false;
                let mut found = None;
                for vars in self.units.values() {
                    if vars.iter().any(|v| v.file.contains(file)) {
                        known_file = true;
                    }
                    if let Some(v) = last_marker(vars, marker, file, line) {
                        found = Some(v);
                    }
                }
                if !known_file {
                    return Err(SiteLookupError::UnknownFile);
                }
                found
            }
        };
        found.map(|v| v.type_id).ok_or(SiteLookupError::NoMarker)
    }
}

fn last_marker<'a>(
    vars: &'a [SourceVariable],
    marker: &str,
    file: &str,
    line: u64,
) -> Option<&'a SourceVariable> {
    vars.iter()
        .rev()
        .find(|v| v.name == marker && v.line <= line && v.file.contains(file))
}
