//! SDL decomposer: one document per type, directive and schema definition,
//! plus one document per object or interface field.

use std::collections::HashMap;

use async_graphql_parser::types::{
    DirectiveDefinition, FieldDefinition, SchemaDefinition, TypeDefinition, TypeKind,
    TypeSystemDefinition,
};
use async_graphql_parser::{Positioned, parse_schema};
use gqlsearch_core::{
    ChunkError, DeclarationDocument, DeclarationKind, Metadata, OperationType, SchemaDecomposer,
    SchemaError, keys,
};
use serde_json::Value;
use tracing::debug;

use crate::chunk::chunk_documents;
use crate::render::{
    argument_types, named_type, referenced_types, render_description,
    render_directive_definition, render_field, render_schema, render_type, schema_operations,
};
use crate::syntax::schema_error;

/// Decomposer for GraphQL schema definition language.
///
/// Extensions are merged into their base definition before documents are
/// built, so `extend type Query` fields become ordinary `Query` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdlDecomposer;

impl SdlDecomposer {
    /// Create a new decomposer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SchemaDecomposer for SdlDecomposer {
    fn parse(&self, schema: &str) -> Result<Vec<DeclarationDocument>, SchemaError> {
        if is_blank(schema) {
            return Ok(Vec::new());
        }
        let document = parse_schema(schema).map_err(|e| schema_error(&e))?;
        let merged = MergedSchema::build(document.definitions)?;
        let roots = merged.root_types();

        let mut documents = Vec::new();
        for definition in &merged.types {
            documents.push(type_document(definition));
            let fields = match &definition.kind {
                TypeKind::Object(object) => &object.fields,
                TypeKind::Interface(interface) => &interface.fields,
                _ => continue,
            };
            let parent = definition.name.node.as_str();
            let root = roots.get(parent).copied();
            for field in fields {
                documents.push(field_document(parent, &field.node, root));
            }
        }
        for directive in &merged.directives {
            documents.push(directive_document(directive));
        }
        if let Some(schema_definition) = &merged.schema {
            documents.push(schema_document(schema_definition));
        }

        debug!(
            "Decomposed schema into {} documents ({} types)",
            documents.len(),
            merged.types.len()
        );
        Ok(documents)
    }

    fn chunk(
        &self,
        documents: &[DeclarationDocument],
        char_limit: usize,
    ) -> Result<Vec<DeclarationDocument>, ChunkError> {
        chunk_documents(documents, char_limit)
    }
}

/// Whitespace and comments only.
fn is_blank(schema: &str) -> bool {
    schema.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

// ============================================================================
// Extension merging
// ============================================================================

struct MergedSchema {
    types: Vec<TypeDefinition>,
    directives: Vec<DirectiveDefinition>,
    schema: Option<SchemaDefinition>,
}

impl MergedSchema {
    fn build(definitions: Vec<TypeSystemDefinition>) -> Result<Self, SchemaError> {
        let mut types: Vec<TypeDefinition> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut directives: Vec<DirectiveDefinition> = Vec::new();
        let mut schema: Option<SchemaDefinition> = None;

        for definition in definitions {
            match definition {
                TypeSystemDefinition::Type(positioned) => {
                    let line = positioned.pos.line;
                    let def = positioned.node;
                    let name = def.name.node.as_str().to_string();
                    let Some(i) = index.get(&name).copied() else {
                        index.insert(name, types.len());
                        types.push(def);
                        continue;
                    };
                    let existing = &mut types[i];
                    let (mut base, extension) = match (existing.extend, def.extend) {
                        (_, true) => (std::mem::replace(existing, def.clone()), def),
                        (true, false) => (def, existing.clone()),
                        (false, false) => {
                            return Err(merge_error(
                                line,
                                format!("duplicate definition of type '{name}'"),
                            ));
                        }
                    };
                    if !merge_kind(&mut base.kind, extension.kind) {
                        return Err(merge_error(
                            line,
                            format!("extension of '{name}' does not match its definition kind"),
                        ));
                    }
                    base.directives.extend(extension.directives);
                    base.extend = base.extend && extension.extend;
                    if base.description.is_none() {
                        base.description = extension.description;
                    }
                    *existing = base;
                }
                TypeSystemDefinition::Directive(def) => directives.push(def.node),
                TypeSystemDefinition::Schema(positioned) => {
                    let line = positioned.pos.line;
                    let def = positioned.node;
                    if let Some(current) = schema.as_mut() {
                        if !def.extend {
                            return Err(merge_error(line, "duplicate schema definition"));
                        }
                        current.directives.extend(def.directives);
                        current.query = current.query.take().or(def.query);
                        current.mutation = current.mutation.take().or(def.mutation);
                        current.subscription = current.subscription.take().or(def.subscription);
                    } else {
                        schema = Some(def);
                    }
                }
            }
        }

        Ok(Self {
            types,
            directives,
            schema,
        })
    }

    /// Root type name to operation type. Falls back to the conventional
    /// `Query`, `Mutation` and `Subscription` names.
    fn root_types(&self) -> HashMap<String, OperationType> {
        let declared = self
            .schema
            .as_ref()
            .map(schema_operations)
            .unwrap_or_default();
        if declared.is_empty() {
            OperationType::ALL
                .into_iter()
                .map(|operation| (operation.root_type_name().to_string(), operation))
                .collect()
        } else {
            declared
                .into_iter()
                .map(|(operation, name)| (name, operation))
                .collect()
        }
    }
}

fn merge_error(line: usize, message: impl Into<String>) -> SchemaError {
    SchemaError::Parse {
        line,
        message: message.into(),
    }
}

/// Append `more` to `target`, skipping names already present.
fn merge_unique<T: PartialEq>(target: &mut Vec<Positioned<T>>, more: Vec<Positioned<T>>) {
    for item in more {
        if !target.iter().any(|existing| existing.node == item.node) {
            target.push(item);
        }
    }
}

/// Append an extension's members. Returns `false` on a kind mismatch.
fn merge_kind(base: &mut TypeKind, extension: TypeKind) -> bool {
    match (base, extension) {
        (TypeKind::Object(object), TypeKind::Object(more)) => {
            merge_unique(&mut object.implements, more.implements);
            object.fields.extend(more.fields);
            true
        }
        (TypeKind::Interface(interface), TypeKind::Interface(more)) => {
            merge_unique(&mut interface.implements, more.implements);
            interface.fields.extend(more.fields);
            true
        }
        (TypeKind::InputObject(input), TypeKind::InputObject(more)) => {
            input.fields.extend(more.fields);
            true
        }
        (TypeKind::Enum(enumeration), TypeKind::Enum(more)) => {
            enumeration.values.extend(more.values);
            true
        }
        (TypeKind::Union(union), TypeKind::Union(more)) => {
            merge_unique(&mut union.members, more.members);
            true
        }
        (TypeKind::Scalar, TypeKind::Scalar) => true,
        _ => false,
    }
}

// ============================================================================
// Document builders
// ============================================================================

fn type_kind(kind: &TypeKind) -> DeclarationKind {
    match kind {
        TypeKind::Object(_) => DeclarationKind::Object,
        TypeKind::Interface(_) => DeclarationKind::Interface,
        TypeKind::InputObject(_) => DeclarationKind::Input,
        TypeKind::Enum(_) => DeclarationKind::Enum,
        TypeKind::Union(_) => DeclarationKind::Union,
        TypeKind::Scalar => DeclarationKind::Scalar,
    }
}

fn string_array(values: Vec<String>) -> Value {
    Value::Array(values.into_iter().map(Value::String).collect())
}

fn description(node: Option<&Positioned<String>>) -> Option<String> {
    node.map(|d| d.node.clone())
}

fn type_document(definition: &TypeDefinition) -> DeclarationDocument {
    let mut metadata = Metadata::new();
    if !matches!(definition.kind, TypeKind::Enum(_) | TypeKind::Scalar) {
        metadata.insert(
            keys::REFERENCED_TYPES.to_string(),
            string_array(referenced_types(definition)),
        );
    }
    DeclarationDocument::new(
        type_kind(&definition.kind),
        definition.name.node.as_str(),
        description(definition.description.as_ref()),
        render_type(definition),
        metadata,
    )
}

fn field_document(
    parent: &str,
    field: &FieldDefinition,
    root: Option<OperationType>,
) -> DeclarationDocument {
    let mut content = String::new();
    if let Some(text) = &field.description {
        content.push_str(&render_description(&text.node, ""));
        content.push('\n');
    }
    content.push_str(parent);
    content.push('.');
    content.push_str(&render_field(field, ""));

    let mut metadata = Metadata::new();
    metadata.insert(keys::PARENT_TYPE.to_string(), Value::from(parent));
    metadata.insert(
        keys::FIELD_TYPE.to_string(),
        Value::from(named_type(&field.ty.node)),
    );
    metadata.insert(
        keys::ARGUMENT_TYPES.to_string(),
        string_array(argument_types(&field.arguments)),
    );
    metadata.insert(
        keys::IS_ROOT_OPERATION_FIELD.to_string(),
        Value::Bool(root.is_some()),
    );
    if let Some(operation) = root {
        metadata.insert(
            keys::ROOT_OPERATION_TYPE.to_string(),
            Value::from(operation.root_type_name()),
        );
    }

    DeclarationDocument::new(
        DeclarationKind::Field,
        field.name.node.as_str(),
        description(field.description.as_ref()),
        content,
        metadata,
    )
}

fn directive_document(definition: &DirectiveDefinition) -> DeclarationDocument {
    let mut metadata = Metadata::new();
    metadata.insert(
        keys::ARGUMENT_TYPES.to_string(),
        string_array(argument_types(&definition.arguments)),
    );
    DeclarationDocument::new(
        DeclarationKind::Directive,
        definition.name.node.as_str(),
        description(definition.description.as_ref()),
        render_directive_definition(definition),
        metadata,
    )
}

fn schema_document(definition: &SchemaDefinition) -> DeclarationDocument {
    let mut metadata = Metadata::new();
    metadata.insert(
        keys::REFERENCED_TYPES.to_string(),
        string_array(
            schema_operations(definition)
                .into_iter()
                .map(|(_, name)| name)
                .collect(),
        ),
    );
    DeclarationDocument::new(
        DeclarationKind::Schema,
        "schema",
        None,
        render_schema(definition),
        metadata,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        "Fetch things"
        type Query {
          "Look up a user by id"
          getUser(id: ID!): User
          search(term: String!, filter: SearchFilter): [SearchResult!]!
        }

        type Mutation {
          createUser(input: CreateUserInput!): User!
        }

        interface Node { id: ID! }

        type User implements Node {
          id: ID!
          name: String
          role: Role!
          posts(first: Int = 10): [Post!]!
        }

        type Post implements Node { id: ID! title: String! author: User! }

        union SearchResult = User | Post

        enum Role { ADMIN MEMBER }

        input SearchFilter { role: Role }

        input CreateUserInput { name: String!, role: Role = MEMBER }

        scalar DateTime

        directive @auth(requires: Role) on FIELD_DEFINITION

        extend type Query { me: User }
    "#;

    fn parse() -> Vec<DeclarationDocument> {
        SdlDecomposer::new().parse(SCHEMA).unwrap()
    }

    fn find<'a>(
        docs: &'a [DeclarationDocument],
        kind: DeclarationKind,
        name: &str,
    ) -> &'a DeclarationDocument {
        docs.iter()
            .find(|d| d.kind == kind && d.name == name)
            .unwrap_or_else(|| panic!("missing {kind} {name}"))
    }

    #[test]
    fn test_root_field_metadata() {
        let docs = parse();
        let get_user = find(&docs, DeclarationKind::Field, "getUser");

        assert!(get_user.is_root_operation_field());
        assert_eq!(get_user.root_operation_type(), Some(OperationType::Query));
        assert_eq!(get_user.field_type(), Some("User"));
        assert_eq!(get_user.argument_types(), vec!["ID"]);
        assert_eq!(get_user.description.as_deref(), Some("Look up a user by id"));
        assert_eq!(
            get_user.content,
            "\"Look up a user by id\"\nQuery.getUser(id: ID!): User"
        );
    }

    #[test]
    fn test_mutation_field_metadata() {
        let docs = parse();
        let create = find(&docs, DeclarationKind::Field, "createUser");
        assert_eq!(create.root_operation_type(), Some(OperationType::Mutation));
        assert_eq!(create.field_type(), Some("User"));
        assert_eq!(create.argument_types(), vec!["CreateUserInput"]);
    }

    #[test]
    fn test_non_root_field_metadata() {
        let docs = parse();
        let posts = docs
            .iter()
            .find(|d| d.name == "posts" && d.metadata_str(keys::PARENT_TYPE) == Some("User"))
            .unwrap();
        assert!(!posts.is_root_operation_field());
        assert_eq!(posts.root_operation_type(), None);
        assert_eq!(posts.field_type(), Some("Post"));
    }

    #[test]
    fn test_extension_fields_merged_into_base() {
        let docs = parse();
        let me = find(&docs, DeclarationKind::Field, "me");
        assert_eq!(me.root_operation_type(), Some(OperationType::Query));

        let queries: Vec<_> = docs
            .iter()
            .filter(|d| d.kind == DeclarationKind::Object && d.name == "Query")
            .collect();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].content.contains("me: User"));
    }

    #[test]
    fn test_type_documents_reference_types() {
        let docs = parse();
        let user = find(&docs, DeclarationKind::Object, "User");
        assert_eq!(
            user.referenced_types(),
            vec!["Node", "ID", "String", "Role", "Post", "Int"]
        );

        let search = find(&docs, DeclarationKind::Union, "SearchResult");
        assert_eq!(search.referenced_types(), vec!["User", "Post"]);

        let input = find(&docs, DeclarationKind::Input, "CreateUserInput");
        assert_eq!(input.referenced_types(), vec!["String", "Role"]);
        assert!(input.content.contains("role: Role = MEMBER"));
    }

    #[test]
    fn test_every_kind_emitted() {
        let docs = parse();
        for kind in [
            DeclarationKind::Field,
            DeclarationKind::Object,
            DeclarationKind::Input,
            DeclarationKind::Enum,
            DeclarationKind::Interface,
            DeclarationKind::Union,
            DeclarationKind::Scalar,
            DeclarationKind::Directive,
        ] {
            assert!(docs.iter().any(|d| d.kind == kind), "no {kind} document");
        }
    }

    #[test]
    fn test_interface_fields_emitted() {
        let docs = parse();
        assert!(docs.iter().any(|d| d.kind == DeclarationKind::Field
            && d.metadata_str(keys::PARENT_TYPE) == Some("Node")));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first: Vec<String> = parse().into_iter().map(|d| d.id).collect();
        let second: Vec<String> = parse().into_iter().map(|d| d.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_root_type_names() {
        let sdl = r"
            schema { query: RootQuery }
            type RootQuery { ping: String }
            type Query { notRoot: String }
        ";
        let docs = SdlDecomposer::new().parse(sdl).unwrap();
        let ping = find(&docs, DeclarationKind::Field, "ping");
        assert_eq!(ping.root_operation_type(), Some(OperationType::Query));
        let not_root = find(&docs, DeclarationKind::Field, "notRoot");
        assert!(!not_root.is_root_operation_field());
        assert!(docs.iter().any(|d| d.kind == DeclarationKind::Schema));
    }

    #[test]
    fn test_extension_before_definition() {
        let sdl = "extend type Query { b: Int }\ntype Query { a: Int }";
        let docs = SdlDecomposer::new().parse(sdl).unwrap();
        let query = find(&docs, DeclarationKind::Object, "Query");
        assert_eq!(query.content, "type Query {\n  a: Int\n  b: Int\n}");
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = SdlDecomposer::new()
            .parse("type A { x: Int }\ntype A { y: Int }")
            .unwrap_err();
        assert!(err.to_string().contains("duplicate definition"));
    }

    #[test]
    fn test_extension_kind_mismatch_rejected() {
        let err = SdlDecomposer::new()
            .parse("type A { x: Int }\nextend enum A { B }")
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = SdlDecomposer::new()
            .parse("type Query {\n  ok: Int\n  broken(: Int\n}")
            .unwrap_err();
        let SchemaError::Parse { line, .. } = err;
        assert!(line >= 3, "line {line}");
    }

    #[test]
    fn test_blank_schema_has_no_documents() {
        assert!(SdlDecomposer::new().parse("  \n# nothing\n").unwrap().is_empty());
    }

    #[test]
    fn test_union_extension_deduplicates_members() {
        let sdl = "type A { x: Int }\ntype B { y: Int }\nunion U = A\nextend union U = A | B";
        let docs = SdlDecomposer::new().parse(sdl).unwrap();
        let union = find(&docs, DeclarationKind::Union, "U");
        assert_eq!(union.content, "union U = A | B");
    }

    #[test]
    fn test_chunk_delegates() {
        let docs = parse();
        let chunks = SdlDecomposer::new().chunk(&docs, 10_000).unwrap();
        assert_eq!(chunks, docs);
    }
}
