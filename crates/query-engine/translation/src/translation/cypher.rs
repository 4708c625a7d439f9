//! Translate an object query to a Cypher graph pattern query.
//!
//! The query walks a single path of edges. Every operation applies to the node reached most
//! recently, and the clauses are emitted in the fixed order `MATCH`, `WHERE`, `RETURN`,
//! `ORDER BY`, `SKIP`, `LIMIT`.

use query_engine_metadata::metadata::{self, ComparisonOperator, ID_KEY};
use query_engine_models::{unqualified, Expression, Literal, Operation, OrderDirection, Query};

use super::error::Error;
use super::helpers::Env;

/// One item of the `RETURN` clause.
#[derive(Debug, Clone, PartialEq)]
struct ReturnItem {
    /// The field name later operations refer to.
    name: String,
    expression: String,
    alias: Option<String>,
    /// The node property it reads, if it is a plain property.
    property: Option<String>,
}

impl ReturnItem {
    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {alias}", self.expression),
            None => self.expression.clone(),
        }
    }
}

struct Translation<'a> {
    env: Env<'a>,
    pattern: String,
    variable: String,
    object_type: String,
    nodes: usize,
    conditions: Vec<String>,
    returns: Option<Vec<ReturnItem>>,
    order_by: Vec<String>,
    skip: Option<u32>,
    limit: Option<u32>,
    aggregated: bool,
    unions: Vec<String>,
}

/// Translate a query into Cypher text.
pub fn translate(metadata: &metadata::Metadata, query: &Query) -> Result<String, Error> {
    let cypher = translate_query(Env::new(metadata), query)?;
    tracing::debug!(cypher, "generated Cypher");
    Ok(cypher)
}

fn translate_query(env: Env, query: &Query) -> Result<String, Error> {
    let object_type = query.source.object_type();
    let info = env.lookup_object_type(object_type)?;
    let label = info.label(object_type);
    let variable = label
        .chars()
        .next()
        .map_or_else(|| "n".to_string(), |c| c.to_lowercase().to_string());

    let mut translation = Translation {
        env,
        pattern: format!("({variable}:{label})"),
        variable,
        object_type: object_type.to_string(),
        nodes: 0,
        conditions: vec![],
        returns: None,
        order_by: vec![],
        skip: None,
        limit: None,
        aggregated: false,
        unions: vec![],
    };

    if let Some(ids) = query.source.ids() {
        let id = translation.property(ID_KEY)?;
        let ids = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
        translation
            .conditions
            .push(format!("{id} IN [{}]", ids.join(", ")));
    }

    translation.apply(&query.operations)?;
    Ok(translation.render())
}

impl Translation<'_> {
    fn info(&self) -> Result<&metadata::ObjectTypeInfo, Error> {
        self.env.lookup_object_type(&self.object_type)
    }

    /// `variable.property` for a field of the current node.
    fn property(&self, reference: &str) -> Result<String, Error> {
        let name = unqualified(reference);
        let info = self.info()?;
        let lookup = if name == "id" && !info.fields.contains_key("id") {
            ID_KEY
        } else {
            name
        };
        match info.lookup_field(lookup) {
            Some((field, _)) => Ok(format!("{}.{field}", self.variable)),
            None => Err(Error::FieldNotFound {
                field: name.to_string(),
                scope: format!("object type '{}'", self.object_type),
            }),
        }
    }

    fn property_item(&self, reference: &str) -> Result<ReturnItem, Error> {
        let expression = self.property(reference)?;
        let property = expression
            .split_once('.')
            .map(|(_, property)| property.to_string());
        Ok(ReturnItem {
            name: unqualified(reference).to_string(),
            expression,
            alias: None,
            property,
        })
    }

    /// The explicit return items, or every field of the current node.
    fn return_items(&self) -> Result<Vec<ReturnItem>, Error> {
        match &self.returns {
            Some(items) => Ok(items.clone()),
            None => self
                .info()?
                .fields
                .keys()
                .map(|field| self.property_item(field))
                .collect(),
        }
    }

    fn is_limited(&self) -> bool {
        self.limit.is_some() || self.skip.is_some()
    }

    fn apply(&mut self, operations: &[Operation]) -> Result<(), Error> {
        let mut traversed = false;
        for operation in operations {
            if !self.unions.is_empty() {
                return Err(unsupported("operations after a union"));
            }
            match operation {
                Operation::Project { fields } => {
                    if self.aggregated {
                        return Err(unsupported("projecting aggregated results"));
                    }
                    let items = fields
                        .iter()
                        .map(|field| self.property_item(field))
                        .collect::<Result<Vec<_>, Error>>()?;
                    self.returns = Some(items);
                }
                Operation::Where { predicate } => {
                    if self.is_limited() || self.aggregated {
                        return Err(unsupported("filters after limits"));
                    }
                    let condition = self.expression(predicate)?;
                    self.conditions.push(match predicate {
                        Expression::Or { .. } => format!("({condition})"),
                        _ => condition,
                    });
                }
                Operation::Take { count } => {
                    self.limit = Some(self.limit.map_or(*count, |limit| limit.min(*count)));
                }
                Operation::Skip { count } => {
                    if self.limit.is_some() {
                        return Err(unsupported("skip after take"));
                    }
                    self.skip = Some(self.skip.unwrap_or(0).saturating_add(*count));
                }
                Operation::Count => {
                    if self.is_limited() || self.aggregated {
                        return Err(unsupported("count after limits"));
                    }
                    self.returns = Some(vec![ReturnItem {
                        name: "count".to_string(),
                        expression: "count(*)".to_string(),
                        alias: None,
                        property: None,
                    }]);
                    self.order_by.clear();
                    self.aggregated = true;
                }
                Operation::Nest { key } => {
                    if self.is_limited() || self.aggregated {
                        return Err(unsupported("nest after limits"));
                    }
                    let collected = match &self.returns {
                        None => self.variable.clone(),
                        Some(items) => {
                            let entries = items
                                .iter()
                                .map(|item| match (&item.alias, &item.property) {
                                    (None, Some(property)) => format!(".{property}"),
                                    _ => format!("{}: {}", item.name, item.expression),
                                })
                                .collect::<Vec<_>>();
                            format!("{} {{{}}}", self.variable, entries.join(", "))
                        }
                    };
                    self.returns = Some(vec![ReturnItem {
                        name: key.clone(),
                        expression: format!("collect({collected})"),
                        alias: Some(key.clone()),
                        property: None,
                    }]);
                    self.order_by.clear();
                    self.aggregated = true;
                }
                Operation::GroupBy { key } => {
                    if self.is_limited() || self.aggregated {
                        return Err(unsupported("group_by after limits"));
                    }
                    let key = self.property(key)?;
                    self.returns = Some(vec![
                        ReturnItem {
                            name: "key".to_string(),
                            expression: key,
                            alias: Some("key".to_string()),
                            property: None,
                        },
                        ReturnItem {
                            name: "items".to_string(),
                            expression: format!("collect({})", self.variable),
                            alias: Some("items".to_string()),
                            property: None,
                        },
                    ]);
                    self.order_by = vec!["key".to_string()];
                    self.aggregated = true;
                }
                Operation::Let { old, new } => {
                    let old = unqualified(old);
                    let new = unqualified(new);
                    let mut items = self.return_items()?;
                    let item = items
                        .iter_mut()
                        .find(|item| item.name == old)
                        .ok_or_else(|| Error::FieldNotFound {
                            field: old.to_string(),
                            scope: format!("object type '{}'", self.object_type),
                        })?;
                    item.name = new.to_string();
                    item.alias = Some(new.to_string());
                    self.returns = Some(items);
                }
                Operation::OrderBy { key, direction } => {
                    if self.is_limited() {
                        return Err(unsupported("sorting after limits"));
                    }
                    let name = unqualified(key);
                    let aliased = self.returns.iter().flatten().any(|item| {
                        item.name == name && item.alias.is_some()
                    });
                    let mut key = if aliased {
                        name.to_string()
                    } else if self.aggregated {
                        return Err(unsupported("sorting aggregated results"));
                    } else {
                        self.property(name)?
                    };
                    if *direction == OrderDirection::Desc {
                        key.push_str(" DESC");
                    }
                    self.order_by.insert(0, key);
                }
                Operation::Edge { edge, operations } => {
                    if traversed {
                        return Err(unsupported("branching edges"));
                    }
                    traversed = true;
                    self.traverse(edge, operations)?;
                }
                Operation::Union { queries } => {
                    for query in queries {
                        self.unions.push(translate_query(self.env, query)?);
                    }
                }
            }
        }
        Ok(())
    }

    /// Extend the pattern along an edge, collapsing repeated hops over the same edge.
    fn traverse(&mut self, edge_name: &str, operations: &[Operation]) -> Result<(), Error> {
        if self.is_limited() || self.aggregated {
            return Err(unsupported("edges after limits"));
        }
        let edge = self.env.lookup_edge(&self.object_type, edge_name)?;

        let mut hops = 1;
        let mut operations = operations;
        let mut pending = vec![];
        while let Some((Operation::Edge { edge: next, operations: inner }, rest)) =
            operations.split_first()
        {
            if next != edge_name {
                break;
            }
            // a sibling edge after the inner hop would hang off the wrong node
            if rest.iter().any(|operation| matches!(operation, Operation::Edge { .. })) {
                return Err(unsupported("branching edges"));
            }
            hops += 1;
            pending.push(rest);
            operations = inner;
        }

        self.nodes += 1;
        let variable = format!("n{}", self.nodes);
        let relationship = edge.edge.relationship_type(edge_name);
        let hops = if hops > 1 {
            format!("*{hops}..{hops}")
        } else {
            String::new()
        };
        self.pattern.push_str(&format!(
            "-[:{relationship}{hops}]->({variable}:{})",
            edge.target.label(edge.target_name)
        ));
        self.variable = variable;
        self.object_type = edge.target_name.to_string();
        self.returns = None;

        self.apply(operations)?;
        for rest in pending.into_iter().rev() {
            self.apply(rest)?;
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut lines = vec![format!("MATCH {}", self.pattern)];
        if !self.conditions.is_empty() {
            lines.push(format!("WHERE {}", self.conditions.join(" AND ")));
        }
        lines.push(match &self.returns {
            None => format!("RETURN {}", self.variable),
            Some(items) => format!(
                "RETURN {}",
                items
                    .iter()
                    .map(ReturnItem::render)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
        if !self.order_by.is_empty() {
            lines.push(format!("ORDER BY {}", self.order_by.join(", ")));
        }
        if let Some(skip) = self.skip {
            lines.push(format!("SKIP {skip}"));
        }
        if let Some(limit) = self.limit {
            lines.push(format!("LIMIT {limit}"));
        }
        for union in &self.unions {
            lines.push("UNION ALL".to_string());
            lines.push(union.clone());
        }
        lines.join("\n")
    }

    fn expression(&self, expression: &Expression) -> Result<String, Error> {
        match expression {
            Expression::And { expressions } if expressions.is_empty() => Ok("true".to_string()),
            Expression::Or { expressions } if expressions.is_empty() => Ok("false".to_string()),
            Expression::And { expressions } => self.joined(expressions, " AND "),
            Expression::Or { expressions } => self.joined(expressions, " OR "),
            Expression::Not { expression } => Ok(format!("NOT ({})", self.expression(expression)?)),
            Expression::BinaryComparison {
                field,
                operator,
                value: Literal::Null,
            } => {
                let property = self.property(field)?;
                match operator {
                    ComparisonOperator::Equals => Ok(format!("{property} IS NULL")),
                    ComparisonOperator::NotEquals => Ok(format!("{property} IS NOT NULL")),
                    _ => Err(Error::NotSupported(format!(
                        "comparing '{field}' with null using '{operator}'"
                    ))),
                }
            }
            Expression::BinaryComparison {
                field,
                operator,
                value,
            } => Ok(format!(
                "{} {} {}",
                self.property(field)?,
                cypher_operator(*operator),
                literal(value)
            )),
            Expression::In { field, values } => {
                let values = values.iter().map(literal).collect::<Vec<_>>();
                Ok(format!("{} IN [{}]", self.property(field)?, values.join(", ")))
            }
            Expression::IsNull { field } => Ok(format!("{} IS NULL", self.property(field)?)),
        }
    }

    fn joined(&self, expressions: &[Expression], separator: &str) -> Result<String, Error> {
        let parts = expressions
            .iter()
            .map(|expression| {
                let text = self.expression(expression)?;
                Ok(match expression {
                    Expression::And { .. } | Expression::Or { .. } => format!("({text})"),
                    _ => text,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(parts.join(separator))
    }
}

fn unsupported(what: &str) -> Error {
    Error::NotSupported(format!("{what} in Cypher output"))
}

fn cypher_operator(operator: ComparisonOperator) -> &'static str {
    match operator {
        ComparisonOperator::Equals => "=",
        ComparisonOperator::NotEquals => "<>",
        other => other.symbol(),
    }
}

fn literal(value: &Literal) -> String {
    value.to_string()
}
