//! Constants module for LiveGraph core
//!
//! Default values shared by the configuration, the pipeline and the CLI.

/// Quiet period before an edit is considered stable (milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Module specifier the base classes are resolved from
pub const DEFAULT_BASE_MODULE: &str = "can";

/// Base class extended by the property description
pub const DEFAULT_BASE_CLASS: &str = "DefineMap";

/// Upper bound on nested evaluation (getter calls, nested blocks)
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 64;

/// Largest string (in bytes) or aggregate value an evaluation may build
pub const MAX_STRING_LENGTH: usize = 1 << 20;

/// Deepest syntax tree accepted from the editor
pub const MAX_SYNTAX_DEPTH: usize = 256;

/// Program shown before the user has typed anything
pub const DEFAULT_SOURCE: &str = r#"import { DefineMap } from "can";

const ViewModel = DefineMap.extend({
  first: { default: "Kevin" },
  last: { default: "McCallister" },
  get name() { return `${this.first} ${this.last}`; }
});"#;
