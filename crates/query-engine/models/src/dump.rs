//! Print a query as an operation tree, outermost operation first.

use std::fmt::Write;

use crate::query::{Operation, OrderDirection, Query, Source};

const INDENT: &str = "    ";

impl Query {
    /// Render the operation tree, one node per line, each node's input indented below it.
    ///
    /// The operations inside an edge bottom out at `PARENT`, the objects reached from each
    /// parent object.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        dump_pipeline(&mut out, 0, &self.operations, &Leaf::Source(&self.source));
        out
    }
}

enum Leaf<'a> {
    Source(&'a Source),
    Parent,
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn dump_pipeline(out: &mut String, depth: usize, operations: &[Operation], leaf: &Leaf) {
    let Some((last, rest)) = operations.split_last() else {
        match leaf {
            Leaf::Source(Source::Collection { object_type, ids }) => {
                let mut text = format!("LEAF {object_type}");
                if let Some(ids) = ids {
                    let ids = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
                    let _ = write!(text, " [{}]", ids.join(", "));
                }
                line(out, depth, &text);
            }
            Leaf::Parent => line(out, depth, "PARENT"),
        }
        return;
    };

    match last {
        Operation::Project { fields } => line(out, depth, &format!("PROJECT [{}]", fields.join(", "))),
        Operation::Where { predicate } => line(out, depth, &format!("WHERE {predicate}")),
        Operation::Take { count } => line(out, depth, &format!("TAKE {count}")),
        Operation::Skip { count } => line(out, depth, &format!("SKIP {count}")),
        Operation::Count => line(out, depth, "COUNT"),
        Operation::Nest { key } => line(out, depth, &format!("NEST {key}")),
        Operation::Let { old, new } => line(out, depth, &format!("LET {old} -> {new}")),
        Operation::OrderBy { key, direction } => match direction {
            OrderDirection::Asc => line(out, depth, &format!("ORDER_BY {key}")),
            OrderDirection::Desc => line(out, depth, &format!("ORDER_BY {key} DESC")),
        },
        Operation::GroupBy { key } => line(out, depth, &format!("GROUP_BY {key}")),
        Operation::Edge { edge, operations } => {
            line(out, depth, &format!("EDGE {edge}"));
            dump_pipeline(out, depth + 1, operations, &Leaf::Parent);
        }
        Operation::Union { queries } => {
            line(out, depth, "UNION");
            for query in queries {
                dump_pipeline(out, depth + 1, &query.operations, &Leaf::Source(&query.source));
            }
        }
    }
    dump_pipeline(out, depth + 1, rest, leaf);
}

#[cfg(test)]
mod tests {
    use crate::QueryBuilder;
    use similar_asserts::assert_eq;

    #[test]
    fn dump_edges_and_unions() {
        let query = QueryBuilder::with_ids("User", [1, 2])
            .where_("user.age >= 16")
            .expect("valid predicate")
            .edge("friends")
            .project(["name"])
            .take(3)
            .parent()
            .union(QueryBuilder::new("Review").count().build())
            .build();

        assert_eq!(
            query.dump(),
            "\
UNION
    COUNT
        LEAF Review
    EDGE friends
        TAKE 3
            PROJECT [name]
                PARENT
        WHERE age >= 16
            LEAF User [1, 2]
"
        );
    }
}
