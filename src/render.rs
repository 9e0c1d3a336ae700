//! Rendering of values as text, driven by the type registry.
//!
//! A `Renderer` holds the state of one top-level render: the addresses of
//! structs already printed (so cyclic object graphs terminate) and the
//! current indentation (so deep nesting is cut off). Every render starts with
//! a fresh one.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

use crate::load::{load_pointer, load_unsigned, sign_extend, to_float};
use crate::memory::Memory;
use crate::model::{
    Array, Encoding, Enumeration, Pointer, Primitive, StructOrUnion, Subroutine,
    TypeDescriptor, TypeId,
};
use crate::DumpDb;

pub const UNRESOLVED: &str = "???";
pub const VOID_TARGET: &str = "<void>";
pub const UNREADABLE: &str = "<unreadable>";

pub struct Renderer<'a, M> {
    db: &'a DumpDb,
    mem: M,
    /// Addresses of every struct rendered so far.
    shown: BTreeSet<u64>,
    /// Indentation of struct members; two columns per level.
    nest: usize,
    out: String,
}

impl<'a, M: Memory> Renderer<'a, M> {
    pub fn new(db: &'a DumpDb, mem: M) -> Self {
        Self {
            db,
            mem,
            shown: BTreeSet::new(),
            nest: 0,
            out: String::new(),
        }
    }

    /// Renders the value of type `ty` stored at `addr`.
    pub fn render(mut self, ty: &'a TypeDescriptor, addr: u64) -> String {
        self.value(ty, addr);
        self.out
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        // Writing to a String cannot fail.
        let _ = self.out.write_fmt(args);
    }

    fn indent(&mut self) {
        for _ in 0..self.nest {
            self.out.push(' ');
        }
    }

    fn value(&mut self, ty: &'a TypeDescriptor, addr: u64) {
        let db = self.db;
        let types = &db.types;
        match ty {
            TypeDescriptor::Primitive(p) => self.primitive(p, addr),
            TypeDescriptor::StructOrUnion(s) => {
                self.aggregate(types.complete(s), addr)
            }
            TypeDescriptor::Pointer(p) => self.pointer(p, addr),
            TypeDescriptor::CvQualified(c) => self.referenced(c.type_id, addr),
            TypeDescriptor::Alias(a) => self.referenced(a.type_id, addr),
            TypeDescriptor::Subroutine(s) => self.subroutine(s, addr),
            TypeDescriptor::Array(a) => self.array(a, addr),
            TypeDescriptor::Enumeration(e) => self.enumeration(e, addr),
        }
    }

    /// Renders through a qualifier or typedef.
    fn referenced(&mut self, id: Option<TypeId>, addr: u64) {
        let id = match id {
            Some(id) => id,
            None => return self.out.push_str(VOID_TARGET),
        };
        let db = self.db;
        match db.types.get(id) {
            Some(t) => self.value(t, addr),
            None => self.out.push_str(UNRESOLVED),
        }
    }

    fn primitive(&mut self, p: &Primitive, addr: u64) {
        let width = p.byte_size as usize;
        if !matches!(width, 1 | 2 | 4 | 8) {
            return self.emit(format_args!("unimplemented primitive '{}'", p.name));
        }
        let raw = match load_unsigned(&self.mem, addr, width) {
            Some(raw) => raw,
            None => return self.out.push_str(UNREADABLE),
        };

        if width == 1 {
            if p.is_bool() {
                self.out.push_str(if raw != 0 { "true" } else { "false" });
            } else if is_printable(raw as u8) {
                self.emit(format_args!("'{}' ({:02x})", raw as u8 as char, raw));
            } else {
                self.emit(format_args!("'\\x{:02x}' ({:02x})", raw, raw));
            }
            return;
        }

        let digits = width * 2;
        match (p.encoding, to_float(raw, width)) {
            (Encoding::Unsigned | Encoding::UnsignedChar | Encoding::Boolean, _) => {
                self.emit(format_args!("{} (0x{:0digits$x})", raw, raw))
            }
            (Encoding::Float, Some(f)) => {
                self.emit(format_args!("{} (0x{:0digits$x})", f, raw))
            }
            _ => self.emit(format_args!(
                "{} (0x{:0digits$x})",
                sign_extend(raw, width),
                raw,
            )),
        }
    }

    fn aggregate(&mut self, s: &'a StructOrUnion, addr: u64) {
        self.shown.insert(addr);

        if self.nest > self.db.config.recursion_limit * 2 {
            return self.out.push_str("{ ... }");
        }

        let db = self.db;
        let types = &db.types;
        self.out.push_str("{\n");
        self.nest += 2;
        for m in &s.members {
            self.indent();
            self.emit(format_args!("{} = ", m.name));
            match types.resolve(m.type_id) {
                Some(t) => {
                    self.value(t, addr.wrapping_add(m.offset));
                    self.emit(format_args!(" : {}\n", t.name(types)));
                }
                None => self.emit(format_args!("{}\n", UNRESOLVED)),
            }
        }
        self.nest -= 2;
        self.indent();
        self.out.push('}');
    }

    fn pointer(&mut self, p: &'a Pointer, addr: u64) {
        let db = self.db;
        let types = &db.types;
        let target = match load_pointer(&self.mem, addr) {
            Some(t) => t,
            None => return self.out.push_str(UNREADABLE),
        };
        if !self.mem.is_readable(target, 1) {
            return self.emit(format_args!("{:#x} <invalid ptr>", target));
        }

        let pointee = match types.resolve(p.type_id) {
            Some(t) => t,
            None => return self.emit(format_args!("{:#x}", target)),
        };
        let bare = match types.strip_cv(pointee) {
            Some(t) => t,
            // const void * and friends
            None => return self.emit(format_args!("{:#x}", target)),
        };

        if let Some(TypeDescriptor::StructOrUnion(_)) = types.strip_aliases(bare) {
            if self.shown.contains(&target) {
                return self.emit(format_args!("{:#x} <previously shown>", target));
            }
        }

        match (bare, types.strip_aliases(bare)) {
            (TypeDescriptor::Primitive(c), _) if c.is_char() => self.c_string(target),
            (_, Some(TypeDescriptor::Subroutine(s))) => {
                self.subroutine(s, target);
                self.emit(format_args!(" [{:#x}]", target));
            }
            _ => {
                self.value(pointee, target);
                self.emit(format_args!(" [{:#x}]", target));
            }
        }
    }

    /// Renders a function signature, naming the function whose entry point
    /// is `entry`.
    fn subroutine(&mut self, s: &'a Subroutine, entry: u64) {
        let db = self.db;
        let types = &db.types;
        let mut args = s
            .parameters
            .iter()
            .map(|&p| types.name_of(p))
            .collect::<Vec<_>>();
        if s.variadic {
            args.push("...".into());
        }
        let name = db
            .functions
            .find_entry(entry, db.base_address)
            .map(|f| f.name.as_str())
            .unwrap_or(UNRESOLVED);
        self.emit(format_args!(
            "{} {}({})",
            types.name_of(s.return_type_id),
            name,
            args.join(", "),
        ));
    }

    fn array(&mut self, a: &'a Array, addr: u64) {
        let db = self.db;
        let types = &db.types;
        if a.count == 0 {
            return self.out.push_str("{}");
        }
        let elt = match types.resolve(a.element_type_id) {
            Some(t) => t,
            None => return self.emit(format_args!("{{ {}, ... }}", UNRESOLVED)),
        };

        if let Some(TypeDescriptor::Primitive(c)) = types.strip_cv(elt) {
            if c.is_char() {
                // One byte past the limit is enough to know to truncate.
                let len = a.count.min(db.config.string_limit as u64 + 1);
                return match self.mem.read_vec(addr, len as usize) {
                    Some(bytes) => self.string(&bytes, addr),
                    None => self.out.push_str(UNREADABLE),
                };
            }
        }

        self.out.push_str("{ ");
        self.value(elt, addr);
        if a.count > 1 {
            self.out.push_str(", ...");
        }
        self.out.push_str(" }");
    }

    fn enumeration(&mut self, e: &'a Enumeration, addr: u64) {
        let width = match e.byte_size {
            1 | 2 | 4 | 8 => e.byte_size,
            _ => Enumeration::DEFAULT_BYTE_SIZE,
        } as usize;
        let raw = match load_unsigned(&self.mem, addr, width) {
            Some(raw) => raw,
            None => return self.out.push_str(UNREADABLE),
        };
        match e.lookup(raw) {
            Some(name) => self.out.push_str(name),
            None => self.emit(format_args!("<unknown:{}>", sign_extend(raw, width))),
        }
    }

    /// Renders the NUL-terminated string at `addr`.
    fn c_string(&mut self, addr: u64) {
        let want = self.db.config.string_limit + 1;
        let mut bytes = match self.mem.read_vec(addr, want) {
            Some(bytes) => bytes,
            // The string may end right before unreadable memory; go one
            // byte at a time.
            None => {
                let mut bytes = vec![];
                while bytes.len() < want {
                    match load_unsigned(&self.mem, addr.wrapping_add(bytes.len() as u64), 1) {
                        Some(0) | None => break,
                        Some(b) => bytes.push(b as u8),
                    }
                }
                bytes
            }
        };
        if let Some(nul) = bytes.iter().position(|&b| b == 0) {
            bytes.truncate(nul);
        }
        self.string(&bytes, addr);
    }

    /// Renders `bytes` as a quoted, escaped string followed by its address,
    /// cutting it off at the configured limit.
    fn string(&mut self, bytes: &[u8], addr: u64) {
        let limit = self.db.config.string_limit;
        self.out.push('"');
        for &b in bytes.iter().take(limit) {
            if is_printable(b) {
                self.out.push(b as char);
            } else {
                self.emit(format_args!("\\x{:02x}", b));
            }
        }
        if bytes.len() > limit {
            self.out.push_str("...");
        }
        self.emit(format_args!("\" [{:#x}]", addr));
    }
}

fn is_printable(b: u8) -> bool {
    (0x20..0x7f).contains(&b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::RenderConfig;
    use crate::memory::ImageMemory;
    use crate::model::{
        AggregateKind, Alias, Member, PointerKind, StructOrUnion,
    };
    use crate::tables::Function;
    use std::collections::BTreeMap;
    use test_log::test;

    const INT: TypeId = TypeId(0x10);
    const SHORT: TypeId = TypeId(0x11);
    const CHAR: TypeId = TypeId(0x12);
    const LONG: TypeId = TypeId(0x13);
    const BOOL: TypeId = TypeId(0x14);
    const UINT: TypeId = TypeId(0x15);
    const FLOAT: TypeId = TypeId(0x16);
    const CHAR_PTR: TypeId = TypeId(0x20);
    const S: TypeId = TypeId(0x30);
    const NODE: TypeId = TypeId(0x40);
    const NODE_PTR: TypeId = TypeId(0x41);

    fn prim(name: &str, byte_size: u64, encoding: Encoding) -> Primitive {
        Primitive {
            name: name.to_string(),
            byte_size,
            encoding,
        }
    }

    fn member(name: &str, ty: TypeId, offset: u64) -> Member {
        Member {
            name: name.to_string(),
            type_id: Some(ty),
            offset,
        }
    }

    fn record(name: &str, members: Vec<Member>) -> StructOrUnion {
        StructOrUnion {
            kind: AggregateKind::Struct,
            name: Some(name.to_string()),
            declaration: false,
            members,
        }
    }

    fn pointer_to(ty: Option<TypeId>) -> Pointer {
        Pointer {
            type_id: ty,
            kind: PointerKind::Pointer,
        }
    }

    fn db() -> DumpDb {
        let mut db = DumpDb::default();
        let t = &mut db.types;
        t.insert(INT, prim("int", 4, Encoding::Signed));
        t.insert(SHORT, prim("short", 2, Encoding::Signed));
        t.insert(CHAR, prim("char", 1, Encoding::SignedChar));
        t.insert(LONG, prim("long", 8, Encoding::Signed));
        t.insert(BOOL, prim("_Bool", 1, Encoding::Boolean));
        t.insert(UINT, prim("unsigned int", 4, Encoding::Unsigned));
        t.insert(FLOAT, prim("float", 4, Encoding::Float));
        t.insert(CHAR_PTR, pointer_to(Some(CHAR)));
        t.insert(
            S,
            record(
                "S",
                vec![member("s", SHORT, 0), member("i", INT, 4), member("str", CHAR_PTR, 8)],
            ),
        );
        t.insert(NODE, record("Node", vec![member("v", INT, 0), member("next", NODE_PTR, 8)]));
        t.insert(NODE_PTR, pointer_to(Some(NODE)));
        db
    }

    fn ptr_bytes(addr: u64) -> Vec<u8> {
        (addr as usize).to_ne_bytes().to_vec()
    }

    fn render(db: &DumpDb, mem: &ImageMemory, ty: TypeId, addr: u64) -> String {
        let ty = db.types.get(ty).unwrap();
        Renderer::new(db, mem).render(ty, addr)
    }

    fn render_bytes(db: &DumpDb, ty: TypeId, bytes: Vec<u8>) -> String {
        let mut mem = ImageMemory::new();
        mem.add(0x1000, bytes);
        render(db, &mem, ty, 0x1000)
    }

    #[test]
    fn primitive_widths() {
        let db = db();
        assert_eq!(render_bytes(&db, CHAR, vec![b'c']), "'c' (63)");
        assert_eq!(render_bytes(&db, CHAR, vec![b'\n']), "'\\x0a' (0a)");
        assert_eq!(render_bytes(&db, BOOL, vec![1]), "true");
        assert_eq!(render_bytes(&db, BOOL, vec![0]), "false");
        assert_eq!(render_bytes(&db, SHORT, 2i16.to_ne_bytes().to_vec()), "2 (0x0002)");
        assert_eq!(render_bytes(&db, SHORT, (-1i16).to_ne_bytes().to_vec()), "-1 (0xffff)");
        assert_eq!(render_bytes(&db, INT, 3i32.to_ne_bytes().to_vec()), "3 (0x00000003)");
        assert_eq!(
            render_bytes(&db, LONG, 4i64.to_ne_bytes().to_vec()),
            "4 (0x0000000000000004)",
        );
        assert_eq!(
            render_bytes(&db, UINT, u32::MAX.to_ne_bytes().to_vec()),
            "4294967295 (0xffffffff)",
        );
        assert_eq!(
            render_bytes(&db, FLOAT, 1.5f32.to_ne_bytes().to_vec()),
            "1.5 (0x3fc00000)",
        );
    }

    #[test]
    fn primitive_placeholders() {
        let mut db = db();
        db.types.insert(TypeId(0x90), prim("int24", 3, Encoding::Signed));
        assert_eq!(render_bytes(&db, TypeId(0x90), vec![0; 3]), "unimplemented primitive 'int24'");
        assert_eq!(render(&db, &ImageMemory::new(), INT, 0x1000), "<unreadable>");
    }

    #[test]
    fn struct_with_string_member() {
        let db = db();
        let mut mem = ImageMemory::new();
        let mut s = vec![0; 16];
        s[0..2].copy_from_slice(&2i16.to_ne_bytes());
        s[4..8].copy_from_slice(&3i32.to_ne_bytes());
        s[8..16].copy_from_slice(&ptr_bytes(0x2000));
        mem.add(0x1000, s);
        mem.add(0x2000, b"hoge-\0".to_vec());

        let expected = "{\n  s = 2 (0x0002) : short\n  i = 3 (0x00000003) : int\n  str = \"hoge-\" [0x2000] : char*\n}";
        assert_eq!(render(&db, &mem, S, 0x1000), expected);
        // Fresh traversal state each time.
        assert_eq!(render(&db, &mem, S, 0x1000), expected);
    }

    #[test]
    fn self_pointer_is_previously_shown() {
        let db = db();
        let mut mem = ImageMemory::new();
        let mut node = 1i32.to_ne_bytes().to_vec();
        node.extend([0; 4]);
        node.extend(ptr_bytes(0x1000));
        mem.add(0x1000, node);

        let out = render(&db, &mem, NODE, 0x1000);
        assert_eq!(
            out,
            "{\n  v = 1 (0x00000001) : int\n  next = 0x1000 <previously shown> : Node*\n}",
        );
        assert_eq!(out.matches("previously shown").count(), 1);
    }

    #[test]
    fn two_node_cycle_terminates() {
        let db = db();
        let mut mem = ImageMemory::new();
        for (at, next) in [(0x1000u64, 0x2000u64), (0x2000, 0x1000)] {
            let mut node = 7i32.to_ne_bytes().to_vec();
            node.extend([0; 4]);
            node.extend(ptr_bytes(next));
            mem.add(at, node);
        }
        let out = render(&db, &mem, NODE, 0x1000);
        assert_eq!(out.matches("previously shown").count(), 1);
        assert!(out.contains("0x1000 <previously shown>"));
    }

    #[test]
    fn deep_nesting_is_cut_off() {
        let mut db = db();
        let r = TypeId(0x50);
        db.types.insert(r, record("R", vec![member("inner", r, 0)]));
        let mem = ImageMemory::new();

        let expected = "{\n  inner = {\n    inner = {\n      inner = { ... } : R\n    } : R\n  } : R\n}";
        assert_eq!(render(&db, &mem, r, 0x1000), expected);

        db.config = RenderConfig { recursion_limit: 1, ..RenderConfig::default() };
        let expected = "{\n  inner = {\n    inner = { ... } : R\n  } : R\n}";
        assert_eq!(render(&db, &mem, r, 0x1000), expected);
    }

    #[test]
    fn strings_are_capped() {
        let db = db();
        for (len, expect_cut) in [(49usize, false), (50, false), (60, true)] {
            let text = (0..len).map(|i| b'a' + (i % 26) as u8).collect::<Vec<_>>();
            let mut mem = ImageMemory::new();
            mem.add(0x1000, ptr_bytes(0x3000));
            let mut stored = text.clone();
            stored.push(0);
            mem.add(0x3000, stored);

            let shown = String::from_utf8(text[..len.min(50)].to_vec()).unwrap();
            let expected = if expect_cut {
                format!("\"{}...\" [0x3000]", shown)
            } else {
                format!("\"{}\" [0x3000]", shown)
            };
            assert_eq!(render(&db, &mem, CHAR_PTR, 0x1000), expected, "length {}", len);
        }
    }

    #[test]
    fn strings_escape_unprintable_bytes() {
        let db = db();
        let mut mem = ImageMemory::new();
        mem.add(0x1000, ptr_bytes(0x3000));
        mem.add(0x3000, b"a\tb\xff\0".to_vec());
        assert_eq!(render(&db, &mem, CHAR_PTR, 0x1000), "\"a\\x09b\\xff\" [0x3000]");
    }

    #[test]
    fn arrays() {
        let mut db = db();
        let ints = TypeId(0x60);
        let one = TypeId(0x61);
        let empty = TypeId(0x62);
        let chars = TypeId(0x63);
        let lost = TypeId(0x64);
        db.types.insert(ints, Array { element_type_id: Some(INT), count: 10 });
        db.types.insert(one, Array { element_type_id: Some(INT), count: 1 });
        db.types.insert(empty, Array { element_type_id: Some(INT), count: 0 });
        db.types.insert(chars, Array { element_type_id: Some(CHAR), count: 4 });
        db.types.insert(lost, Array { element_type_id: Some(TypeId(0x999)), count: 2 });

        let data = (0..10i32).flat_map(|i| (i + 7).to_ne_bytes()).collect::<Vec<_>>();
        assert_eq!(render_bytes(&db, ints, data.clone()), "{ 7 (0x00000007), ... }");
        assert_eq!(render_bytes(&db, one, data), "{ 7 (0x00000007) }");
        assert_eq!(render_bytes(&db, empty, vec![]), "{}");
        assert_eq!(render_bytes(&db, chars, b"ab\0\0".to_vec()), "\"ab\\x00\\x00\" [0x1000]");
        assert_eq!(render_bytes(&db, lost, vec![0; 8]), "{ ???, ... }");
        assert_eq!(db.types.get(ints).unwrap().name(&db.types), "int[10]");
    }

    #[test]
    fn function_pointer_signature() {
        let mut db = db();
        let sig = TypeId(0x70);
        let fp = TypeId(0x71);
        db.types.insert(
            sig,
            Subroutine {
                return_type_id: Some(INT),
                parameters: vec![Some(INT), Some(CHAR_PTR)],
                variadic: false,
            },
        );
        db.types.insert(fp, pointer_to(Some(sig)));
        db.functions.push(Function { name: "add".to_string(), low: 0x400, high: 0x480 });
        db.base_address = 0x5000_0000;

        let mut mem = ImageMemory::new();
        mem.add(0x1000, ptr_bytes(0x5000_0400));
        mem.add(0x5000_0400, vec![0xc3; 16]);
        assert_eq!(render(&db, &mem, fp, 0x1000), "int add(int, char*) [0x50000400]");
        assert_eq!(db.types.get(fp).unwrap().name(&db.types), "int(int, char*)*");

        let mut mem = ImageMemory::new();
        mem.add(0x1000, ptr_bytes(0x5000_0404));
        mem.add(0x5000_0400, vec![0xc3; 16]);
        assert_eq!(render(&db, &mem, fp, 0x1000), "int ???(int, char*) [0x50000404]");
    }

    #[test]
    fn void_returning_variadic_signature() {
        let mut db = db();
        let sig = TypeId(0x70);
        db.types.insert(
            sig,
            Subroutine { return_type_id: None, parameters: vec![Some(CHAR_PTR)], variadic: true },
        );
        db.functions.push(Function { name: "log".to_string(), low: 0x1000, high: 0x1010 });
        assert_eq!(render_bytes(&db, sig, vec![0; 8]), "void log(char*, ...)");
    }

    #[test]
    fn enumerations() {
        let mut db = db();
        let color = TypeId(0x80);
        let mut enumerators = BTreeMap::new();
        enumerators.insert(0, "RED".to_string());
        enumerators.insert(1, "GREEN".to_string());
        db.types.insert(color, Enumeration { name: Some("Color".into()), byte_size: 4, enumerators });

        assert_eq!(render_bytes(&db, color, 1i32.to_ne_bytes().to_vec()), "GREEN");
        assert_eq!(render_bytes(&db, color, 7i32.to_ne_bytes().to_vec()), "<unknown:7>");
        assert_eq!(render_bytes(&db, color, (-1i32).to_ne_bytes().to_vec()), "<unknown:-1>");
    }

    #[test]
    fn pointer_placeholders() {
        let mut db = db();
        let void_ptr = TypeId(0x90);
        let lost_ptr = TypeId(0x91);
        let int_ptr = TypeId(0x92);
        db.types.insert(void_ptr, pointer_to(None));
        db.types.insert(lost_ptr, pointer_to(Some(TypeId(0x999))));
        db.types.insert(int_ptr, pointer_to(Some(INT)));

        let mut mem = ImageMemory::new();
        mem.add(0x1000, ptr_bytes(0x2000));
        mem.add(0x2000, 42i32.to_ne_bytes().to_vec());
        mem.add(0x3000, ptr_bytes(0xdead_0000));

        assert_eq!(render(&db, &mem, void_ptr, 0x1000), "0x2000");
        assert_eq!(render(&db, &mem, lost_ptr, 0x1000), "0x2000");
        assert_eq!(render(&db, &mem, int_ptr, 0x1000), "42 (0x0000002a) [0x2000]");
        assert_eq!(render(&db, &mem, int_ptr, 0x3000), "0xdead0000 <invalid ptr>");
    }

    #[test]
    fn typedefs_and_unresolved_members() {
        let mut db = db();
        let void_alias = TypeId(0xa0);
        let int_alias = TypeId(0xa1);
        let broken = TypeId(0xa2);
        db.types.insert(void_alias, Alias { name: "nothing".into(), type_id: None });
        db.types.insert(int_alias, Alias { name: "myint".into(), type_id: Some(INT) });
        db.types.insert(
            broken,
            record("Broken", vec![member("x", TypeId(0x999), 0), member("y", int_alias, 0)]),
        );

        assert_eq!(render_bytes(&db, void_alias, vec![0; 4]), "<void>");
        assert_eq!(
            render_bytes(&db, broken, 5i32.to_ne_bytes().to_vec()),
            "{\n  x = ???\n  y = 5 (0x00000005) : myint\n}",
        );
    }

    #[test]
    fn declaration_renders_through_definition() {
        let mut db = db();
        let decl = TypeId(0xb0);
        let decl_ptr = TypeId(0xb1);
        db.types.insert(
            decl,
            StructOrUnion {
                kind: AggregateKind::Struct,
                name: Some("S".to_string()),
                declaration: true,
                members: vec![],
            },
        );
        db.types.insert(decl_ptr, pointer_to(Some(decl)));

        let mut mem = ImageMemory::new();
        mem.add(0x1000, ptr_bytes(0x2000));
        let mut s = vec![0; 16];
        s[4..8].copy_from_slice(&9i32.to_ne_bytes());
        mem.add(0x2000, s);

        let out = render(&db, &mem, decl_ptr, 0x1000);
        assert!(out.contains("i = 9 (0x00000009) : int"), "{}", out);
        assert!(out.ends_with("} [0x2000]"), "{}", out);
    }
}
