//! blocklist-compiler - compiles Adblock Plus style filter lists into
//! WebKit content-blocker rule sets.
//!
//! A `Compiler` accumulates `Filter`s produced by `parser::parse_line`
//! and turns them into the JSON-serializable `Rule` list the target
//! engine consumes, running the pattern lowerer, domain classifier,
//! resource-type mapper, rule emitter, element-hide grouper, and
//! (optionally) the rule-set optimizer in sequence.

pub mod compiler;
pub mod domain;
pub mod elemhide;
pub mod emitter;
pub mod error;
pub mod filter;
pub mod optimizer;
pub mod parser;
pub mod pattern;
pub mod resource_type;
pub mod rule;
pub mod scheduler;

pub use compiler::{Compiler, CompilerConfig, MergeMode};
pub use error::CompilerError;
pub use filter::{ContentType, Filter, FilterKind};
pub use rule::Rule;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiling_a_small_list_end_to_end() {
        let mut compiler = Compiler::new(CompilerConfig::default());
        for line in ["||example.com^", "##.ad-banner", "@@||trusted.com^$document"] {
            if let Some(filter) = parser::parse_line(line) {
                compiler.add_filter(filter);
            }
        }
        let rules = compiler.generate_rules().unwrap();
        assert_eq!(rules.len(), 3);
    }
}
