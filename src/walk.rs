//! Traversal of compile unit entry trees.
//!
//! The walker visits every entry of a unit, depth first, and sorts what it
//! finds into the three tables: types go to the `TypeRegistry`, subprograms
//! with code to the `FunctionTable`, and variables and parameters with a
//! source location to the `SourceVariableIndex`.

use gimli::constants as gim_con;
use tracing::{debug, trace};

use crate::build::build_type;
use crate::die::{AttrValue, Die};
use crate::error::{Error, Result};
use crate::model::NO_NAME;
use crate::registry::TypeRegistry;
use crate::tables::{Function, FunctionTable, SourceVariable, SourceVariableIndex};

pub struct Walker<'a> {
    types: &'a mut TypeRegistry,
    functions: &'a mut FunctionTable,
    variables: &'a mut SourceVariableIndex,
    /// Name of the compile unit being walked; variables are filed under it.
    unit_name: String,
}

impl<'a> Walker<'a> {
    pub fn new(
        types: &'a mut TypeRegistry,
        functions: &'a mut FunctionTable,
        variables: &'a mut SourceVariableIndex,
    ) -> Self {
        Self {
            types,
            functions,
            variables,
            unit_name: String::new(),
        }
    }

    /// Walks `die` and all of its descendants.
    ///
    /// Stops at the first entry that cannot be decoded. Whatever was recorded
    /// before that point stays in the tables.
    pub fn walk(&mut self, die: &Die) -> Result<()> {
        match die.tag {
            gim_con::DW_TAG_compile_unit | gim_con::DW_TAG_partial_unit => {
                self.unit_name = die.name()?.unwrap_or(NO_NAME).to_string();
                debug!("walking unit {}", self.unit_name);
            }
            gim_con::DW_TAG_subprogram => self.record_function(die)?,
            gim_con::DW_TAG_variable | gim_con::DW_TAG_formal_parameter => {
                self.record_variable(die)?
            }
            _ => {
                if let Some(ty) = build_type(die, self.types)? {
                    trace!("{} {} at {}", ty.kind(), ty.name(self.types), die.id());
                    self.types.insert(die.id(), ty);
                }
            }
        }

        for child in &die.children {
            self.walk(child)?;
        }
        Ok(())
    }

    /// Records a subprogram if it has a non-empty code range.
    fn record_function(&mut self, die: &Die) -> Result<()> {
        let low = match die.address(gim_con::DW_AT_low_pc)? {
            Some(low) => low,
            None => return Ok(()),
        };
        let high = match die.attr(gim_con::DW_AT_high_pc) {
            None => return Ok(()),
            Some(AttrValue::Address(a)) => *a,
            // DWARF 4 and later give the high bound as a length.
            Some(AttrValue::Unsigned(len)) => low.wrapping_add(*len),
            Some(_) => {
                return Err(Error::Attribute {
                    offset: die.offset,
                    attr: gim_con::DW_AT_high_pc,
                    found: "neither address nor length",
                })
            }
        };
        if low == 0 || high == 0 {
            return Ok(());
        }

        let name = match die.name()? {
            Some(n) => n,
            None => die.string(gim_con::DW_AT_linkage_name)?.unwrap_or(NO_NAME),
        };
        self.functions.push(Function {
            name: name.to_string(),
            low,
            high,
        });
        Ok(())
    }

    /// Records a variable or parameter that has both a declaring file and
    /// line.
    fn record_variable(&mut self, die: &Die) -> Result<()> {
        let (file, line) = match (
            die.file(gim_con::DW_AT_decl_file)?,
            die.udata(gim_con::DW_AT_decl_line)?,
        ) {
            (Some(file), Some(line)) => (file, line),
            _ => return Ok(()),
        };
        self.variables.push(
            &self.unit_name,
            SourceVariable {
                name: die.name()?.unwrap_or(NO_NAME).to_string(),
                file: file.to_string(),
                line,
                type_id: die.type_ref(gim_con::DW_AT_type)?,
            },
        );
        Ok(())
    }
}
