//! Canonical SDL rendering of parsed declarations.

use std::fmt::Write as _;

use async_graphql_parser::Positioned;
use async_graphql_parser::types::{
    BaseType, ConstDirective, DirectiveDefinition, FieldDefinition, InputValueDefinition,
    SchemaDefinition, Type, TypeDefinition, TypeKind,
};
use gqlsearch_core::OperationType;

/// The named type with list and non-null wrappers removed.
#[must_use]
pub fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

pub(crate) const fn keyword(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Object(_) => "type",
        TypeKind::Interface(_) => "interface",
        TypeKind::InputObject(_) => "input",
        TypeKind::Enum(_) => "enum",
        TypeKind::Union(_) => "union",
        TypeKind::Scalar => "scalar",
    }
}

/// Named types a definition refers to, excluding itself.
#[must_use]
pub fn referenced_types(definition: &TypeDefinition) -> Vec<String> {
    let own = definition.name.node.as_str();
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if name != own && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };
    match &definition.kind {
        TypeKind::Object(object) => {
            object.implements.iter().for_each(|i| push(i.node.as_str()));
            push_field_types(&object.fields, &mut push);
        }
        TypeKind::Interface(interface) => {
            interface.implements.iter().for_each(|i| push(i.node.as_str()));
            push_field_types(&interface.fields, &mut push);
        }
        TypeKind::InputObject(input) => {
            for field in &input.fields {
                push(named_type(&field.node.ty.node));
            }
        }
        TypeKind::Union(union) => union.members.iter().for_each(|m| push(m.node.as_str())),
        TypeKind::Enum(_) | TypeKind::Scalar => {}
    }
    names
}

fn push_field_types(fields: &[Positioned<FieldDefinition>], push: &mut impl FnMut(&str)) {
    for field in fields {
        push(named_type(&field.node.ty.node));
        for arg in &field.node.arguments {
            push(named_type(&arg.node.ty.node));
        }
    }
}

/// Distinct named argument types in declaration order.
#[must_use]
pub fn argument_types(arguments: &[Positioned<InputValueDefinition>]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for arg in arguments {
        let named = named_type(&arg.node.ty.node);
        if !types.iter().any(|t| t == named) {
            types.push(named.to_string());
        }
    }
    types
}

// ============================================================================
// Definitions
// ============================================================================

/// Canonical SDL for a type definition, extensions already merged.
#[must_use]
pub fn render_type(definition: &TypeDefinition) -> String {
    let mut out = String::new();
    push_description(&mut out, definition.description.as_ref(), "");
    let _ = write!(
        out,
        "{} {}",
        keyword(&definition.kind),
        definition.name.node.as_str()
    );

    match &definition.kind {
        TypeKind::Object(object) => {
            push_implements(&mut out, object.implements.iter().map(|i| i.node.as_str()));
            push_directives(&mut out, &definition.directives);
            push_fields(&mut out, &object.fields);
        }
        TypeKind::Interface(interface) => {
            push_implements(&mut out, interface.implements.iter().map(|i| i.node.as_str()));
            push_directives(&mut out, &definition.directives);
            push_fields(&mut out, &interface.fields);
        }
        TypeKind::InputObject(input) => {
            push_directives(&mut out, &definition.directives);
            if !input.fields.is_empty() {
                out.push_str(" {\n");
                for field in &input.fields {
                    push_description(&mut out, field.node.description.as_ref(), "  ");
                    let _ = writeln!(out, "  {}", render_input_value(&field.node));
                }
                out.push('}');
            }
        }
        TypeKind::Enum(enumeration) => {
            push_directives(&mut out, &definition.directives);
            if !enumeration.values.is_empty() {
                out.push_str(" {\n");
                for value in &enumeration.values {
                    push_description(&mut out, value.node.description.as_ref(), "  ");
                    let _ = write!(out, "  {}", value.node.value.node.as_str());
                    push_directives(&mut out, &value.node.directives);
                    out.push('\n');
                }
                out.push('}');
            }
        }
        TypeKind::Union(union) => {
            push_directives(&mut out, &definition.directives);
            if !union.members.is_empty() {
                let members: Vec<&str> = union.members.iter().map(|m| m.node.as_str()).collect();
                let _ = write!(out, " = {}", members.join(" | "));
            }
        }
        TypeKind::Scalar => push_directives(&mut out, &definition.directives),
    }
    out
}

/// Field signature at the given indentation, without its description.
#[must_use]
pub fn render_field(field: &FieldDefinition, indent: &str) -> String {
    let mut out = String::from(field.name.node.as_str());
    out.push_str(&render_arguments(&field.arguments, indent));
    let _ = write!(out, ": {}", field.ty.node);
    push_directives(&mut out, &field.directives);
    out
}

#[must_use]
pub fn render_directive_definition(definition: &DirectiveDefinition) -> String {
    let mut out = String::new();
    push_description(&mut out, definition.description.as_ref(), "");
    let _ = write!(
        out,
        "directive @{}{}",
        definition.name.node.as_str(),
        render_arguments(&definition.arguments, "")
    );
    if definition.is_repeatable {
        out.push_str(" repeatable");
    }
    let locations: Vec<String> = definition
        .locations
        .iter()
        .map(|location| screaming_snake(&format!("{:?}", location.node)))
        .collect();
    let _ = write!(out, " on {}", locations.join(" | "));
    out
}

#[must_use]
pub fn render_schema(definition: &SchemaDefinition) -> String {
    let mut out = String::from("schema");
    push_directives(&mut out, &definition.directives);
    let operations = schema_operations(definition);
    if !operations.is_empty() {
        out.push_str(" {\n");
        for (operation, type_name) in operations {
            let _ = writeln!(out, "  {}: {type_name}", operation.keyword());
        }
        out.push('}');
    }
    out
}

/// Root operation bindings declared by a schema definition.
#[must_use]
pub fn schema_operations(definition: &SchemaDefinition) -> Vec<(OperationType, String)> {
    [
        (OperationType::Query, &definition.query),
        (OperationType::Mutation, &definition.mutation),
        (OperationType::Subscription, &definition.subscription),
    ]
    .into_iter()
    .filter_map(|(operation, name)| {
        name.as_ref()
            .map(|name| (operation, name.node.as_str().to_string()))
    })
    .collect()
}

// ============================================================================
// Helpers
// ============================================================================

/// Render a description as a string literal; multi-line text uses a block string.
#[must_use]
pub fn render_description(description: &str, indent: &str) -> String {
    if description.contains('\n') {
        let mut out = format!("{indent}\"\"\"\n");
        for line in description.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "{indent}{}", line.replace("\"\"\"", "\\\"\"\""));
            }
        }
        let _ = write!(out, "{indent}\"\"\"");
        out
    } else {
        format!("{indent}{}", quote(description))
    }
}

/// Quote a value as a GraphQL string literal.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn push_description(out: &mut String, description: Option<&Positioned<String>>, indent: &str) {
    if let Some(description) = description {
        out.push_str(&render_description(&description.node, indent));
        out.push('\n');
    }
}

fn push_implements<'a>(out: &mut String, interfaces: impl Iterator<Item = &'a str>) {
    let names: Vec<&str> = interfaces.collect();
    if !names.is_empty() {
        let _ = write!(out, " implements {}", names.join(" & "));
    }
}

fn push_fields(out: &mut String, fields: &[Positioned<FieldDefinition>]) {
    if fields.is_empty() {
        return;
    }
    out.push_str(" {\n");
    for field in fields {
        push_description(out, field.node.description.as_ref(), "  ");
        let _ = writeln!(out, "  {}", render_field(&field.node, "  "));
    }
    out.push('}');
}

fn push_directives(out: &mut String, directives: &[Positioned<ConstDirective>]) {
    for directive in directives {
        let _ = write!(out, " {}", render_directive(&directive.node));
    }
}

fn render_directive(directive: &ConstDirective) -> String {
    let mut out = format!("@{}", directive.name.node.as_str());
    if !directive.arguments.is_empty() {
        let args: Vec<String> = directive
            .arguments
            .iter()
            .map(|(name, value)| format!("{}: {}", name.node.as_str(), value.node))
            .collect();
        let _ = write!(out, "({})", args.join(", "));
    }
    out
}

fn render_input_value(value: &InputValueDefinition) -> String {
    let mut out = format!("{}: {}", value.name.node.as_str(), value.ty.node);
    if let Some(default) = &value.default_value {
        let _ = write!(out, " = {}", default.node);
    }
    push_directives(&mut out, &value.directives);
    out
}

/// Arguments inline, or one per line when any carries a description.
fn render_arguments(arguments: &[Positioned<InputValueDefinition>], indent: &str) -> String {
    if arguments.is_empty() {
        return String::new();
    }
    if arguments.iter().all(|arg| arg.node.description.is_none()) {
        let args: Vec<String> = arguments
            .iter()
            .map(|arg| render_input_value(&arg.node))
            .collect();
        return format!("({})", args.join(", "));
    }

    let inner = format!("{indent}  ");
    let mut out = String::from("(\n");
    for arg in arguments {
        push_description(&mut out, arg.node.description.as_ref(), &inner);
        let _ = writeln!(out, "{inner}{}", render_input_value(&arg.node));
    }
    let _ = write!(out, "{indent})");
    out
}

/// `FieldDefinition` to `FIELD_DEFINITION`.
fn screaming_snake(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, c) in camel.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql_parser::parse_schema;
    use async_graphql_parser::types::TypeSystemDefinition;

    fn first_type(sdl: &str) -> TypeDefinition {
        let document = parse_schema(sdl).unwrap();
        document
            .definitions
            .into_iter()
            .find_map(|definition| match definition {
                TypeSystemDefinition::Type(def) => Some(def.node),
                _ => None,
            })
            .unwrap()
    }

    fn first_directive(sdl: &str) -> DirectiveDefinition {
        let document = parse_schema(sdl).unwrap();
        document
            .definitions
            .into_iter()
            .find_map(|definition| match definition {
                TypeSystemDefinition::Directive(def) => Some(def.node),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_field_render_inline_arguments() {
        let def = first_type("type User { posts(first: Int = 10): [Post!]! }");
        let TypeKind::Object(object) = &def.kind else {
            panic!("not an object");
        };
        let field = &object.fields[0].node;
        assert_eq!(render_field(field, ""), "posts(first: Int = 10): [Post!]!");
        assert_eq!(named_type(&field.ty.node), "Post");
    }

    #[test]
    fn test_described_arguments_one_per_line() {
        let def = first_type("type Query { user(\"The id\" id: ID!, full: Boolean): User }");
        let TypeKind::Object(object) = &def.kind else {
            panic!("not an object");
        };
        assert_eq!(
            render_field(&object.fields[0].node, "  "),
            "user(\n    \"The id\"\n    id: ID!\n    full: Boolean\n  ): User"
        );
    }

    #[test]
    fn test_argument_types_deduplicated() {
        let def = first_type("type Q { between(from: Date!, to: Date!, tag: String): Int }");
        let TypeKind::Object(object) = &def.kind else {
            panic!("not an object");
        };
        assert_eq!(
            argument_types(&object.fields[0].node.arguments),
            vec!["Date", "String"]
        );
    }

    #[test]
    fn test_union_render_and_references() {
        let def = first_type("\"Anything searchable\"\nunion SearchResult = User | Post");
        assert_eq!(
            render_type(&def),
            "\"Anything searchable\"\nunion SearchResult = User | Post"
        );
        assert_eq!(referenced_types(&def), vec!["User", "Post"]);
    }

    #[test]
    fn test_enum_render_with_directive() {
        let def = first_type("enum Role { ADMIN MEMBER @deprecated(reason: \"use ADMIN\") }");
        assert_eq!(
            render_type(&def),
            "enum Role {\n  ADMIN\n  MEMBER @deprecated(reason: \"use ADMIN\")\n}"
        );
        assert!(referenced_types(&def).is_empty());
    }

    #[test]
    fn test_directive_definition_render() {
        let def = first_directive(
            "directive @auth(requires: Role = ADMIN) repeatable on FIELD_DEFINITION | OBJECT",
        );
        assert_eq!(
            render_directive_definition(&def),
            "directive @auth(requires: Role = ADMIN) repeatable on FIELD_DEFINITION | OBJECT"
        );
    }

    #[test]
    fn test_multiline_description_block() {
        let rendered = render_description("line one\nline two", "  ");
        assert_eq!(rendered, "  \"\"\"\n  line one\n  line two\n  \"\"\"");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a \"b\" \\"), r#""a \"b\" \\""#);
    }

    #[test]
    fn test_screaming_snake() {
        assert_eq!(screaming_snake("FieldDefinition"), "FIELD_DEFINITION");
        assert_eq!(screaming_snake("Query"), "QUERY");
    }
}
