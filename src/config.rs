//! Rendering knobs.

/// Name of the variable `dump!` materializes at each call site. The site
/// lookup finds the call's type through this variable's declaration.
pub const DEFAULT_MARKER_NAME: &str = "dump_vp_";

/// Limits and names that shape rendered output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderConfig {
    /// Struct nesting beyond twice this many levels renders as `{ ... }`.
    pub recursion_limit: usize,
    /// Maximum number of characters shown from a string before it is cut
    /// off with `...`.
    pub string_limit: usize,
    pub marker_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 2,
            string_limit: 50,
            marker_name: DEFAULT_MARKER_NAME.to_string(),
        }
    }
}
