//! Renders values in a running program's memory as text, using the DWARF
//! debug info of the binary the program was built from.
//!
//! Loading a binary into a `DumpDb` builds a model of its types, functions
//! and source-level variables. Afterwards any address can be rendered given
//! either a type name or the source location of a `dump!` invocation.

pub mod build;
pub mod config;
pub mod die;
pub mod dwarf_parser;
pub mod error;
pub mod load;
pub mod macros;
pub mod memory;
pub mod model;
pub mod registry;
pub mod render;
pub mod tables;
pub mod walk;

use std::path::Path;

use object::Object;
use tracing::{debug, info};

pub use crate::config::RenderConfig;
pub use crate::error::{Error, Result};
pub use crate::memory::{ImageMemory, Memory};
#[cfg(unix)]
pub use crate::memory::LiveMemory;
pub use crate::model::{TypeDescriptor, TypeId};
pub use crate::registry::TypeRegistry;
pub use crate::render::Renderer;
pub use crate::tables::{FunctionTable, SiteLookupError, SourceVariableIndex};

const ARCHIVE_MAGIC: &[u8] = b"!<arch>\n";

/// Everything extracted from the debug info of one program.
///
/// Fill it with `open` or `load_path`, then render. Loading more than one
/// file into the same database merges their contents; entries with the same
/// key from a later file replace earlier ones.
#[derive(Clone, Debug, Default)]
pub struct DumpDb {
    pub types: TypeRegistry,
    pub functions: FunctionTable,
    pub variables: SourceVariableIndex,
    /// Address the program was loaded at. Function addresses in the debug
    /// info are relative to this.
    pub base_address: u64,
    pub config: RenderConfig,
}

/// Counts from one call to `load_path` or `load_bytes`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LoadSummary {
    /// Objects whose debug info was loaded.
    pub objects: usize,
    /// Archive members skipped for not being objects or for lacking debug
    /// info.
    pub skipped: usize,
}

impl DumpDb {
    /// Creates a database from the object file or archive at `path`.
    pub fn open(path: impl AsRef<Path>, base_address: Option<u64>) -> Result<Self> {
        let mut db = Self {
            base_address: base_address.unwrap_or(0),
            ..Self::default()
        };
        db.load_path(path)?;
        Ok(db)
    }

    /// Adds the debug info of the object file or archive at `path`.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<LoadSummary> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::Open {
            path: path.to_owned(),
            source,
        })?;
        debug!("loading {} ({} bytes)", path.display(), data.len());
        self.load_bytes(&data)
    }

    /// Adds the debug info of an object file or `ar` archive held in memory.
    ///
    /// Archive members that are not objects, or that carry no debug info, are
    /// skipped. A lone file in a format we don't recognize is skipped too.
    pub fn load_bytes(&mut self, data: &[u8]) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();

        if !data.starts_with(ARCHIVE_MAGIC) {
            match object::File::parse(data) {
                Ok(object) => self.load_member(&object, "<object>", &mut summary)?,
                Err(e) => {
                    debug!("not an object file: {}", e);
                    summary.skipped += 1;
                }
            }
            return Ok(summary);
        }

        let archive = object::read::archive::ArchiveFile::parse(data)?;
        for member in archive.members() {
            let member = member?;
            let name = String::from_utf8_lossy(member.name()).into_owned();
            let bytes = member.data(data)?;
            match object::File::parse(bytes) {
                Ok(object) => self.load_member(&object, &name, &mut summary)?,
                Err(e) => {
                    debug!("skipping archive member {}: {}", name, e);
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }

    fn load_member(
        &mut self,
        object: &object::File<'_>,
        name: &str,
        summary: &mut LoadSummary,
    ) -> Result<()> {
        if object.section_by_name(".debug_info").is_none() {
            info!("{} has no debug info, skipping", name);
            summary.skipped += 1;
            return Ok(());
        }
        self.load_object(object)?;
        summary.objects += 1;
        Ok(())
    }

    /// Walks every unit of `object`'s debug info into the tables.
    ///
    /// On error, whatever was recorded before the failing entry stays.
    pub fn load_object(&mut self, object: &object::File<'_>) -> Result<()> {
        let mut walker = walk::Walker::new(
            &mut self.types,
            &mut self.functions,
            &mut self.variables,
        );
        dwarf_parser::parse_file(object, |die| walker.walk(&die))?;
        debug!(
            "now {} types, {} functions, {} variables",
            self.types.len(),
            self.functions.len(),
            self.variables.len(),
        );
        Ok(())
    }

    /// Renders the value at `addr` as the type registered under `type_name`.
    ///
    /// Returns an empty string if no type has that name.
    pub fn render_by_type_name(
        &self,
        mem: impl Memory,
        addr: u64,
        type_name: &str,
    ) -> String {
        match self.types.by_name(type_name) {
            Some((_, ty)) => Renderer::new(self, mem).render(ty, addr),
            None => {
                debug!("no type named {}", type_name);
                String::new()
            }
        }
    }

    /// Renders the marker variable at `addr` as declared by the `dump!`
    /// invocation at `file:line`, as `name = value : type`.
    ///
    /// If the declaration cannot be found, the result explains why instead.
    pub fn render_by_site(
        &self,
        mem: impl Memory,
        addr: u64,
        name: &str,
        file: &str,
        line: u64,
    ) -> String {
        let marker = &self.config.marker_name;
        let type_id = match self.variables.find_marker(marker, file, line) {
            Ok(t) => t,
            Err(SiteLookupError::UnknownFile) => {
                return format!("cannot find debug_info of {}", file);
            }
            Err(SiteLookupError::NoMarker) => {
                return format!("cannot find type of {}", name);
            }
        };
        let ty = match self.types.resolve(type_id) {
            Some(ty) => ty,
            None => return format!("cannot find type info of {}", name),
        };
        let value = Renderer::new(self, mem).render(ty, addr);
        format!("{} = {} : {}", name, value, ty.name(&self.types))
    }

    /// Prints the value at `addr` in this process's memory as `type_name`.
    #[cfg(unix)]
    pub fn render(&self, addr: u64, type_name: &str) {
        match LiveMemory::new() {
            Ok(mem) => println!("{}", self.render_by_type_name(mem, addr, type_name)),
            Err(e) => tracing::warn!("cannot probe memory: {}", e),
        }
    }

    /// Prints the value at `addr` in this process's memory, typed by the
    /// `dump!` invocation at `file:line`. Used by `dump!`.
    #[cfg(unix)]
    pub fn render_at_site(&self, addr: u64, name: &str, file: &str, line: u32) {
        match LiveMemory::new() {
            Ok(mem) => println!(
                "{}",
                self.render_by_site(mem, addr, name, file, u64::from(line)),
            ),
            Err(e) => tracing::warn!("cannot probe memory: {}", e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{AggregateKind, Encoding, Member, Pointer, PointerKind, Primitive, StructOrUnion};
    use crate::tables::SourceVariable;
    use test_log::test;

    const INT: TypeId = TypeId(0x10);
    const PAIR: TypeId = TypeId(0x20);
    const PAIR_PTR: TypeId = TypeId(0x30);

    fn db() -> DumpDb {
        let mut db = DumpDb::default();
        db.types.insert(
            INT,
            Primitive { name: "int".into(), byte_size: 4, encoding: Encoding::Signed },
        );
        db.types.insert(
            PAIR,
            StructOrUnion {
                kind: AggregateKind::Struct,
                name: Some("Pair".into()),
                declaration: false,
                members: vec![
                    Member { name: "a".into(), type_id: Some(INT), offset: 0 },
                    Member { name: "b".into(), type_id: Some(INT), offset: 4 },
                ],
            },
        );
        db.types.insert(PAIR_PTR, Pointer { type_id: Some(PAIR), kind: PointerKind::Pointer });
        db.variables.push(
            "main.c",
            SourceVariable {
                name: "dump_vp_".into(),
                file: "/src/main.c".into(),
                line: 10,
                type_id: Some(PAIR_PTR),
            },
        );
        db.variables.push(
            "main.c",
            SourceVariable {
                name: "dump_vp_".into(),
                file: "/src/main.c".into(),
                line: 20,
                type_id: Some(TypeId(0x999)),
            },
        );
        db
    }

    fn memory() -> ImageMemory {
        let mut mem = ImageMemory::new();
        mem.add(0x1000, 0x2000usize.to_ne_bytes().to_vec());
        let mut pair = 1i32.to_ne_bytes().to_vec();
        pair.extend(2i32.to_ne_bytes());
        mem.add(0x2000, pair);
        mem
    }

    #[test]
    fn render_by_name() {
        let db = db();
        let mem = memory();
        assert_eq!(
            db.render_by_type_name(&mem, 0x2000, "Pair"),
            "{\n  a = 1 (0x00000001) : int\n  b = 2 (0x00000002) : int\n}",
        );
        assert_eq!(db.render_by_type_name(&mem, 0x2000, "NoSuchType"), "");
    }

    #[test]
    fn render_by_site_formats_and_explains() {
        let db = db();
        let mem = memory();

        let out = db.render_by_site(&mem, 0x1000, "pair", "main.c", 12);
        assert!(out.starts_with("pair = {\n  a = 1 (0x00000001) : int\n"), "{}", out);
        assert!(out.ends_with("} [0x2000] : Pair*"), "{}", out);

        assert_eq!(
            db.render_by_site(&mem, 0x1000, "pair", "other.c", 12),
            "cannot find debug_info of other.c",
        );
        assert_eq!(
            db.render_by_site(&mem, 0x1000, "pair", "main.c", 5),
            "cannot find type of pair",
        );
        assert_eq!(
            db.render_by_site(&mem, 0x1000, "pair", "main.c", 25),
            "cannot find type info of pair",
        );
    }

    #[test]
    fn load_skips_unrecognized_input() {
        let mut db = DumpDb::default();
        let summary = db.load_bytes(b"definitely not an object file").unwrap();
        assert_eq!(summary, LoadSummary { objects: 0, skipped: 1 });
        assert!(db.types.is_empty());
    }

    #[test]
    fn open_reports_missing_file() {
        match DumpDb::open("/nonexistent/dwdump-test", None) {
            Err(Error::Open { path, .. }) => assert_eq!(path, Path::new("/nonexistent/dwdump-test")),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
