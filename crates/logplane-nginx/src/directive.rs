//! Typed nginx directive tree.
//!
//! The proxy config is assembled as a tree of tagged directive nodes
//! and serialized to nginx's native syntax at the boundary. Args are
//! stored verbatim, already quoted where nginx requires quoting.

use serde::{Deserialize, Serialize};

/// One nginx directive, simple (`name args;`) or block (`name args { … }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    Simple {
        name: String,
        args: Vec<String>,
    },
    Block {
        name: String,
        args: Vec<String>,
        children: Vec<Directive>,
    },
}

impl Directive {
    pub fn simple(name: &str, args: &[&str]) -> Self {
        Directive::Simple {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn block(name: &str, args: &[&str], children: Vec<Directive>) -> Self {
        Directive::Block {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            children,
        }
    }

    /// Render a directive list to nginx config-file syntax.
    pub fn render_all(directives: &[Directive]) -> String {
        let mut out = String::new();
        for directive in directives {
            directive.render_into(&mut out, 0);
        }
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "    ".repeat(depth);
        match self {
            Directive::Simple { name, args } => {
                out.push_str(&indent);
                out.push_str(name);
                for arg in args {
                    out.push(' ');
                    out.push_str(arg);
                }
                out.push_str(";\n");
            }
            Directive::Block {
                name,
                args,
                children,
            } => {
                out.push_str(&indent);
                out.push_str(name);
                for arg in args {
                    out.push(' ');
                    out.push_str(arg);
                }
                out.push_str(" {\n");
                for child in children {
                    child.render_into(out, depth + 1);
                }
                out.push_str(&indent);
                out.push_str("}\n");
            }
        }
    }
}
