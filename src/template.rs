//! Build-descriptor templating
//!
//! Templates are [Tera](https://keats.github.io/tera/) sources, compiled once and
//! rendered once per platform. Templates are strict: any reference to a name that
//! is not one of the variables below (or bound by `set`, `for` or a macro) is
//! rejected when the template is compiled, including references that only appear
//! in `if` conditions, filters or tests.
//!
//! Available variables:
//!
//! | Name            | Value                                  |
//! |-----------------|----------------------------------------|
//! | `package`       | package name                           |
//! | `version`       | package version                        |
//! | `revision`      | package revision                       |
//! | `platform`      | platform of the iteration in progress  |
//! | `disable_cache` | whether image builds skip the cache    |
//!
//! ```
//! use rpmbox::config::BuildConfig;
//! use rpmbox::template::DescriptorTemplate;
//!
//! let template = DescriptorTemplate::compile("FROM centos:{{ platform }}\n").unwrap();
//! let mut config = BuildConfig::builder("demo", "1.0").build();
//! config.current_platform = "el7".to_string();
//!
//! assert_eq!(template.render(&config).unwrap(), "FROM centos:el7\n");
//! ```

use crate::config::BuildConfig;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tera::ast::{Expr, ExprVal, FunctionCall, Node};
use tera::{Context, Tera};
use thiserror::Error;

const TEMPLATE_NAME: &str = "Dockerfile.in";

/// Names every template can reference; mirrors the fields of `DescriptorContext`
pub const CONTEXT_VARIABLES: [&str; 5] =
    ["package", "version", "revision", "platform", "disable_cache"];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Error reading template file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing template {name}: {message}")]
    Syntax {
        name: String,
        message: String,
        error: tera::Error,
    },

    #[error("Error rendering template {name} for platform {platform}: {message}")]
    Render {
        name: String,
        platform: String,
        message: String,
        error: tera::Error,
    },
}

/// Values exposed to the template
#[derive(Debug, Serialize)]
struct DescriptorContext<'a> {
    package: &'a str,
    version: &'a str,
    revision: &'a str,
    platform: &'a str,
    disable_cache: bool,
}

impl<'a> From<&'a BuildConfig> for DescriptorContext<'a> {
    fn from(config: &'a BuildConfig) -> Self {
        Self {
            package: &config.package,
            version: &config.version,
            revision: &config.revision,
            platform: &config.current_platform,
            disable_cache: config.disable_cache,
        }
    }
}

/// A compiled descriptor template
#[derive(Debug)]
pub struct DescriptorTemplate {
    tera: Tera,
    name: String,
}

impl DescriptorTemplate {
    /// Compiles an in-memory template source.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        Self::compile_named(TEMPLATE_NAME, source)
    }

    /// Reads and compiles the template at `path`; the path names the template in errors.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::compile_named(&path.display().to_string(), &source)
    }

    fn compile_named(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(name, source)
            .map_err(|error| TemplateError::Syntax {
                name: name.to_string(),
                message: error_chain(&error),
                error,
            })?;

        let ast = &tera
            .get_template(name)
            .map_err(|error| TemplateError::Syntax {
                name: name.to_string(),
                message: error_chain(&error),
                error,
            })?
            .ast;
        let mut scope: HashSet<String> = CONTEXT_VARIABLES
            .iter()
            .chain(["__tera_context"].iter())
            .map(|v| v.to_string())
            .collect();
        if let Some(variable) = first_unknown_in_nodes(ast, &mut scope) {
            let message = format!(
                "Variable `{}` is not defined; available variables are {}",
                variable,
                CONTEXT_VARIABLES.join(", ")
            );
            return Err(TemplateError::Syntax {
                name: name.to_string(),
                error: tera::Error::msg(&message),
                message,
            });
        }

        Ok(Self {
            tera,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the descriptor for `config.current_platform`.
    pub fn render(&self, config: &BuildConfig) -> Result<String, TemplateError> {
        let render_error = |error: tera::Error| TemplateError::Render {
            name: self.name.clone(),
            platform: config.current_platform.clone(),
            message: error_chain(&error),
            error,
        };

        let context =
            Context::from_serialize(DescriptorContext::from(config)).map_err(render_error)?;
        self.tera.render(&self.name, &context).map_err(render_error)
    }
}

/// Root of a variable path: `loop.index` -> `loop`, `items[0]` -> `items`
fn root_name(ident: &str) -> &str {
    ident
        .split(|c: char| c == '.' || c == '[')
        .next()
        .unwrap_or(ident)
}

fn check_ident(ident: &str, scope: &HashSet<String>) -> Option<String> {
    let root = root_name(ident);
    if scope.contains(root) {
        None
    } else {
        Some(root.to_string())
    }
}

/// Walks `nodes` in order, extending `scope` with `set` targets, and returns the
/// first name referenced outside of it.
fn first_unknown_in_nodes(nodes: &[Node], scope: &mut HashSet<String>) -> Option<String> {
    for node in nodes {
        let found = match node {
            Node::VariableBlock(_, expr) => first_unknown_in_expr(expr, scope),
            Node::Set(_, set) => {
                let found = first_unknown_in_expr(&set.value, scope);
                scope.insert(set.key.clone());
                found
            }
            Node::If(cond, _) => cond
                .conditions
                .iter()
                .find_map(|(_, expr, body)| {
                    first_unknown_in_expr(expr, scope)
                        .or_else(|| first_unknown_in_nodes(body, &mut scope.clone()))
                })
                .or_else(|| {
                    cond.otherwise
                        .as_ref()
                        .and_then(|(_, body)| first_unknown_in_nodes(body, &mut scope.clone()))
                }),
            Node::Forloop(_, forloop, _) => {
                first_unknown_in_expr(&forloop.container, scope).or_else(|| {
                    let mut inner = scope.clone();
                    inner.insert("loop".to_string());
                    inner.insert(forloop.value.clone());
                    if let Some(key) = &forloop.key {
                        inner.insert(key.clone());
                    }
                    first_unknown_in_nodes(&forloop.body, &mut inner).or_else(|| {
                        forloop
                            .empty_body
                            .as_ref()
                            .and_then(|body| first_unknown_in_nodes(body, &mut scope.clone()))
                    })
                })
            }
            Node::FilterSection(_, section, _) => first_unknown_in_call(&section.filter, scope)
                .or_else(|| first_unknown_in_nodes(&section.body, &mut scope.clone())),
            Node::Block(_, block, _) => first_unknown_in_nodes(&block.body, &mut scope.clone()),
            Node::MacroDefinition(_, definition, _) => {
                let mut inner: HashSet<String> = definition.args.keys().cloned().collect();
                definition
                    .args
                    .values()
                    .flatten()
                    .find_map(|default| first_unknown_in_expr(default, &inner))
                    .or_else(|| first_unknown_in_nodes(&definition.body, &mut inner))
            }
            _ => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn first_unknown_in_call(call: &FunctionCall, scope: &HashSet<String>) -> Option<String> {
    call.args
        .values()
        .find_map(|arg| first_unknown_in_expr(arg, scope))
}

fn first_unknown_in_expr(expr: &Expr, scope: &HashSet<String>) -> Option<String> {
    first_unknown_in_val(&expr.val, scope).or_else(|| {
        expr.filters
            .iter()
            .find_map(|filter| first_unknown_in_call(filter, scope))
    })
}

fn first_unknown_in_val(val: &ExprVal, scope: &HashSet<String>) -> Option<String> {
    match val {
        ExprVal::Ident(ident) => check_ident(ident, scope),
        ExprVal::Math(math) => first_unknown_in_expr(&math.lhs, scope)
            .or_else(|| first_unknown_in_expr(&math.rhs, scope)),
        ExprVal::Logic(logic) => first_unknown_in_expr(&logic.lhs, scope)
            .or_else(|| first_unknown_in_expr(&logic.rhs, scope)),
        ExprVal::Test(test) => check_ident(&test.ident, scope).or_else(|| {
            test.args
                .iter()
                .find_map(|arg| first_unknown_in_expr(arg, scope))
        }),
        ExprVal::MacroCall(call) => call
            .args
            .values()
            .find_map(|arg| first_unknown_in_expr(arg, scope)),
        ExprVal::FunctionCall(call) => first_unknown_in_call(call, scope),
        ExprVal::Array(items) => items
            .iter()
            .find_map(|item| first_unknown_in_expr(item, scope)),
        ExprVal::StringConcat(concat) => concat
            .values
            .iter()
            .find_map(|value| first_unknown_in_val(value, scope)),
        ExprVal::In(contains) => first_unknown_in_expr(&contains.lhs, scope)
            .or_else(|| first_unknown_in_expr(&contains.rhs, scope)),
        ExprVal::String(_) | ExprVal::Int(_) | ExprVal::Float(_) | ExprVal::Bool(_) => None,
    }
}

/// Flattens a Tera error and its causes; the undefined variable or parse position
/// is only present in the causes.
fn error_chain(err: &tera::Error) -> String {
    let mut parts = Vec::new();
    let mut current: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(platform: &str) -> BuildConfig {
        let mut config = BuildConfig::builder("demo", "1.0").revision("1").build();
        config.current_platform = platform.to_string();
        config
    }

    #[test]
    fn test_render_substitutes_all_fields() {
        let template = DescriptorTemplate::compile(
            "FROM centos:{{ platform }}\nRUN build {{ package }}-{{ version }}-{{ revision }} {{ disable_cache }}\n",
        )
        .unwrap();

        let rendered = template.render(&config_for("el7")).unwrap();
        assert_eq!(
            rendered,
            "FROM centos:el7\nRUN build demo-1.0-1 false\n"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let template = DescriptorTemplate::compile("FROM {{ package }}:{{ platform }}").unwrap();
        let config = config_for("el6");
        assert_eq!(
            template.render(&config).unwrap(),
            template.render(&config).unwrap()
        );
    }

    #[test]
    fn test_render_rebinds_platform() {
        let template = DescriptorTemplate::compile("{{ platform }}").unwrap();
        assert_eq!(template.render(&config_for("el5")).unwrap(), "el5");
        assert_eq!(template.render(&config_for("el7")).unwrap(), "el7");
    }

    fn undefined_name(source: &str) -> String {
        match DescriptorTemplate::compile(source).unwrap_err() {
            TemplateError::Syntax { message, .. } => message,
            other => panic!("Expected Syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let message = undefined_name("FROM {{ distro }}");
        assert!(message.contains("`distro`"), "{}", message);
        assert!(message.contains("disable_cache"), "{}", message);
    }

    #[test]
    fn test_undefined_variable_in_condition_is_an_error() {
        assert!(undefined_name("A{% if os %}X{% endif %}B").contains("`os`"));
        assert!(undefined_name("{% if platform == 'el7' %}{% elif disable_cach %}{% endif %}")
            .contains("`disable_cach`"));
        assert!(undefined_name("{% if not nocache and disable_cache %}{% endif %}")
            .contains("`nocache`"));
    }

    #[test]
    fn test_undefined_variable_in_filter_or_test_is_an_error() {
        assert!(undefined_name("{{ package | replace(from='-', to=sep) }}").contains("`sep`"));
        assert!(undefined_name("{% if arch is defined %}{% endif %}").contains("`arch`"));
        assert!(undefined_name("{% for p in platforms %}{{ p }}{% endfor %}")
            .contains("`platforms`"));
    }

    #[test]
    fn test_locally_bound_names_are_accepted() {
        let template = DescriptorTemplate::compile(
            "{% set tag = package ~ '-' ~ version %}\
             {% for part in ['a', 'b'] %}{{ part }}{{ loop.index }}{% endfor %} {{ tag }}\
             {% if disable_cache %} nocache{% endif %}",
        )
        .unwrap();
        assert_eq!(
            template.render(&config_for("el7")).unwrap(),
            "a1b2 demo-1.0"
        );
    }

    #[test]
    fn test_render_error_names_platform() {
        let template = DescriptorTemplate::compile("RUN make -j{{ revision * 2 }}").unwrap();
        match template.render(&config_for("el7")).unwrap_err() {
            TemplateError::Render { platform, .. } => assert_eq!(platform, "el7"),
            other => panic!("Expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error() {
        let err = DescriptorTemplate::compile("FROM {{ platform ").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_no_html_escaping() {
        let template = DescriptorTemplate::compile("RUN echo {{ package }}").unwrap();
        let mut config = BuildConfig::builder("a&b<c>", "1").build();
        config.current_platform = "el7".to_string();
        assert_eq!(template.render(&config).unwrap(), "RUN echo a&b<c>");
    }

    #[test]
    fn test_load_missing_file() {
        let err = DescriptorTemplate::load(Path::new("/nonexistent/Dockerfile.in")).unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/Dockerfile.in"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dockerfile.in");
        std::fs::write(&path, "FROM base:{{ platform }}").unwrap();

        let template = DescriptorTemplate::load(&path).unwrap();
        assert_eq!(template.name(), path.display().to_string());
        assert_eq!(
            template.render(&config_for("el6")).unwrap(),
            "FROM base:el6"
        );
    }
}
