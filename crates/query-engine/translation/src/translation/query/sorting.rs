//! Translate ordering and grouping.

use query_engine_models::OrderDirection;
use query_engine_sql::sql;

use super::fields::{self, OutputColumn};
use super::root::CurrentSelect;
use crate::translation::error::Error;
use crate::translation::helpers::{Env, State};

/// Sort the current select by a field. The newest sort key is the primary one.
pub fn translate_order_by(
    env: &Env,
    current: &mut CurrentSelect,
    key: &str,
    direction: OrderDirection,
) -> Result<(), Error> {
    let target = fields::lookup_field(env, current, key)?.expression;
    let direction = match direction {
        OrderDirection::Asc => sql::ast::OrderByDirection::Asc,
        OrderDirection::Desc => sql::ast::OrderByDirection::Desc,
    };
    current
        .select
        .order_by
        .elements
        .insert(0, sql::ast::OrderByElement { target, direction });
    Ok(())
}

/// Group the rows of the current select by a field, producing one `{key, items}` row per
/// distinct value, in ascending key order.
pub fn translate_group_by(
    env: &Env,
    state: &mut State,
    current: CurrentSelect,
    key: &str,
) -> Result<CurrentSelect, Error> {
    let mut wrapped = current.wrap(state);
    let table = wrapped.table_reference();
    let key_field = fields::lookup_field(env, &wrapped, key)?;

    wrapped.columns = vec![
        OutputColumn {
            scalar_type: key_field.scalar_type,
            ..OutputColumn::computed("key", key_field.expression.clone())
        },
        OutputColumn::computed("items", sql::helpers::json_agg(table)),
    ];
    wrapped.select.group_by = sql::ast::GroupBy {
        elements: vec![key_field.expression.clone()],
    };
    wrapped.select.order_by = sql::ast::OrderBy {
        elements: vec![sql::ast::OrderByElement {
            target: key_field.expression,
            direction: sql::ast::OrderByDirection::Asc,
        }],
    };
    wrapped.object_type = None;
    wrapped.sealed = true;
    Ok(wrapped)
}
