use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use tracing_subscriber::EnvFilter;

use dwdump::model::TypeDescriptor;
use dwdump::{DumpDb, ImageMemory, RenderConfig, TypeId};

/// Interactive browser for the types, functions and variables in a binary's
/// debug info.
#[derive(Debug, Parser)]
struct DwSh {
    filename: std::path::PathBuf,
    /// Address the program is loaded at; function addresses are relative to
    /// this.
    #[arg(long, value_parser = parse_int::parse::<u64>)]
    base: Option<u64>,
    /// Struct nesting depth rendered before eliding with `{ ... }`.
    #[arg(long, default_value_t = RenderConfig::default().recursion_limit)]
    recursion_limit: usize,
    /// Characters of a string shown before cutting it off.
    #[arg(long, default_value_t = RenderConfig::default().string_limit)]
    string_limit: usize,
}

/// What the shell commands work on.
struct Session {
    db: DumpDb,
    /// Initialized data of the file, for `dump`.
    image: ImageMemory,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = DwSh::parse();

    let buffer = std::fs::read(&args.filename)
        .with_context(|| format!("reading {}", args.filename.display()))?;
    let mut db = DumpDb {
        base_address: args.base.unwrap_or(0),
        config: RenderConfig {
            recursion_limit: args.recursion_limit,
            string_limit: args.string_limit,
            ..RenderConfig::default()
        },
        ..DumpDb::default()
    };
    let summary = db.load_bytes(&buffer)?;

    // Archives have no single address space to render from.
    let image = match object::File::parse(&*buffer) {
        Ok(object) => ImageMemory::from_object(&object)?,
        Err(_) => ImageMemory::new(),
    };

    println!(
        "Loaded {} object(s); {} types, {} functions, {} variables.",
        summary.objects,
        db.types.len(),
        db.functions.len(),
        db.variables.len(),
    );
    println!("To quit: ^D or exit");

    let session = Session { db, image };

    let mut rl = rustyline::DefaultEditor::new()?;
    let prompt = ansi_term::Colour::Green.paint(">> ").to_string();
    'lineloop:
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                let (cmd, rest) = line.split_once(char::is_whitespace)
                    .unwrap_or((line, ""));
                if line.is_empty() {
                    continue 'lineloop;
                }

                rl.add_history_entry(line)?;

                match cmd {
                    "exit" => break,
                    "help" => {
                        println!("commands:");
                        for (name, _, desc) in COMMANDS {
                            println!("{:12} {}", name, desc);
                        }
                    }
                    _ => {
                        for (name, imp, _) in COMMANDS {
                            if *name == cmd {
                                imp(&session, rest.trim());
                                continue 'lineloop;
                            }
                        }
                        println!("unknown command: {}", cmd);
                        println!("for help, try: help");
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                println!("{:?}", e);
                break;
            }
        }
    }

    Ok(())
}

struct NamedId<'a>(&'a DumpDb, Option<TypeId>);

impl std::fmt::Display for NamedId<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let bold = ansi_term::Style::new().bold();
        let dim = ansi_term::Style::new().dimmed();

        write!(f, "{}", bold.paint(self.0.types.name_of(self.1)))?;
        if let Some(id) = self.1 {
            write!(f, " {}{}{}", dim.prefix(), id, dim.suffix())?;
        }
        Ok(())
    }
}

type Command = fn(&Session, &str);

static COMMANDS: &[(&str, Command, &str)] = &[
    ("list", cmd_list, "print names of ALL named types, or those matching a regex"),
    ("info", cmd_info, "print a summary of a type"),
    ("funcs", cmd_funcs, "print functions, or those matching a regex"),
    ("addr", cmd_addr, "look up the function containing an address"),
    ("vars", cmd_vars, "list recorded variables declared in a source file"),
    ("dump", cmd_dump, "render the value of a type at an address in the file's data"),
];

/// Compiles a filter, where an empty argument matches everything.
fn filter(args: &str) -> Option<Option<Regex>> {
    if args.is_empty() {
        return Some(None);
    }
    match Regex::new(args) {
        Ok(re) => Some(Some(re)),
        Err(e) => {
            println!("bad regex: {}", e);
            None
        }
    }
}

fn parse_addr(s: &str) -> Option<u64> {
    match parse_int::parse::<u64>(s) {
        Ok(a) => Some(a),
        Err(_) => {
            println!("can't parse {} as an address", s);
            None
        }
    }
}

/// Finds a type by name, or by `<.debug_info+0x...>` reference.
fn lookup_type<'a>(db: &'a DumpDb, s: &str) -> Option<(TypeId, &'a TypeDescriptor)> {
    if let Some(hex) = s.strip_prefix("<.debug_info+0x").and_then(|r| r.strip_suffix('>')) {
        let id = match usize::from_str_radix(hex, 16) {
            Ok(n) => TypeId(n),
            Err(_) => {
                println!("can't parse {} as hex", hex);
                return None;
            }
        };
        return match db.types.get(id) {
            Some(t) => Some((id, t)),
            None => {
                println!("no type at {}", id);
                None
            }
        };
    }
    let found = db.types.by_name(s);
    if found.is_none() {
        println!("no type named {}", s);
    }
    found
}

fn cmd_list(session: &Session, args: &str) {
    let db = &session.db;
    let re = match filter(args) {
        Some(re) => re,
        None => return,
    };
    for (name, id) in db.types.names() {
        if let Some(re) = &re {
            if !re.is_match(name) {
                continue;
            }
        }
        if let Some(ty) = db.types.get(id) {
            println!("{:8} {}", ty.kind(), NamedId(db, Some(id)));
        }
    }
}

fn cmd_info(session: &Session, args: &str) {
    let db = &session.db;
    let (id, ty) = match lookup_type(db, args) {
        Some(x) => x,
        None => return,
    };
    println!("{}", NamedId(db, Some(id)));
    match ty {
        TypeDescriptor::Primitive(p) => {
            println!("base type");
            println!("- encoding: {:?}", p.encoding);
            println!("- byte size: {}", p.byte_size);
        }
        TypeDescriptor::StructOrUnion(s) => {
            println!("{} type", ty.kind());
            if s.declaration {
                println!("- declaration only");
            }
            println!("- members:");
            for m in &s.members {
                println!("  - {} @ +0x{:x}: {}", m.name, m.offset, NamedId(db, m.type_id));
            }
        }
        TypeDescriptor::Pointer(p) => {
            println!("pointer type ({:?})", p.kind);
            println!("- points to: {}", NamedId(db, p.type_id));
        }
        TypeDescriptor::CvQualified(c) => {
            println!("{:?} qualifier", c.qualifier);
            println!("- of: {}", NamedId(db, c.type_id));
        }
        TypeDescriptor::Alias(a) => {
            println!("typedef");
            println!("- for: {}", NamedId(db, a.type_id));
        }
        TypeDescriptor::Subroutine(s) => {
            println!("subroutine type");
            println!("- returns: {}", NamedId(db, s.return_type_id));
            for (i, &p) in s.parameters.iter().enumerate() {
                println!("- arg {}: {}", i, NamedId(db, p));
            }
            if s.variadic {
                println!("- variadic");
            }
        }
        TypeDescriptor::Array(a) => {
            println!("array type");
            println!("- element type: {}", NamedId(db, a.element_type_id));
            println!("- count: {}", a.count);
        }
        TypeDescriptor::Enumeration(e) => {
            println!("enum type");
            println!("- byte size: {}", e.byte_size);
            for (value, name) in &e.enumerators {
                println!("  - {} = {}", name, value);
            }
        }
    }
}

fn cmd_funcs(session: &Session, args: &str) {
    let db = &session.db;
    let re = match filter(args) {
        Some(re) => re,
        None => return,
    };
    for f in db.functions.iter() {
        if let Some(re) = &re {
            if !re.is_match(&f.name) {
                continue;
            }
        }
        println!(
            "0x{:016x}..0x{:016x} {}",
            f.low.wrapping_add(db.base_address),
            f.high.wrapping_add(db.base_address),
            f.name,
        );
    }
}

fn cmd_addr(session: &Session, args: &str) {
    let db = &session.db;
    let addr = match parse_addr(args) {
        Some(a) => a,
        None => return,
    };
    let bold = ansi_term::Style::new().bold();
    match db.functions.find_containing(addr, db.base_address) {
        Some(f) => {
            let start = f.low.wrapping_add(db.base_address);
            println!("Offset +0x{:x} into {}", addr - start, bold.paint(&f.name));
            if let Some(entry) = db.functions.find_entry(addr, db.base_address) {
                println!("- entry point of {}", entry.name);
            }
        }
        None => println!("Nothing known about address 0x{:x}.", addr),
    }
}

fn cmd_vars(session: &Session, args: &str) {
    let db = &session.db;
    for (unit, vars) in db.variables.units() {
        let vars = vars
            .iter()
            .filter(|v| args.is_empty() || v.file.contains(args))
            .collect::<Vec<_>>();
        if vars.is_empty() {
            continue;
        }
        println!("{}", ansi_term::Style::new().bold().paint(unit));
        for v in vars {
            println!("  {}:{} {}: {}", v.file, v.line, v.name, NamedId(db, v.type_id));
        }
    }
}

fn cmd_dump(session: &Session, args: &str) {
    let db = &session.db;
    let (name, addr) = match args.rsplit_once(char::is_whitespace) {
        Some(x) => x,
        None => {
            println!("usage: dump TYPE ADDR");
            return;
        }
    };
    let (_, ty) = match lookup_type(db, name.trim()) {
        Some(x) => x,
        None => return,
    };
    let addr = match parse_addr(addr) {
        Some(a) => a,
        None => return,
    };
    let out = dwdump::Renderer::new(db, &session.image).render(ty, addr);
    println!("{}", out);
}
