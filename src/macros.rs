//! Call-site capture.

/// Prints `expr` as rendered through the debug info in `db`, typed by the
/// expression's declared type at the call site.
///
/// Expands to a marker variable holding a reference to `expr`. The marker's
/// declaration (name, file and line) is what the debug info records, and the
/// lookup by `file!()`/`line!()` recovers its type. Only works in builds
/// that keep debug info for local variables.
///
/// ```ignore
/// let db = dwdump::DumpDb::open(std::env::current_exe()?, None)?;
/// let point = Point { x: 1, y: 2 };
/// dwdump::dump!(db, point);
/// ```
#[macro_export]
macro_rules! dump {
    ($db:expr, $e:expr) => {{
        let dump_vp_ = &$e;
        $db.render_at_site(
            &dump_vp_ as *const _ as u64,
            stringify!($e),
            file!(),
            line!(),
        );
    }};
}

/// Like `dump!`, but the marker holds a copy of the value rather than a
/// reference to it.
#[macro_export]
macro_rules! dump_value {
    ($db:expr, $e:expr) => {{
        let dump_vp_ = $e;
        $db.render_at_site(
            &dump_vp_ as *const _ as u64,
            stringify!($e),
            file!(),
            line!(),
        );
    }};
}
