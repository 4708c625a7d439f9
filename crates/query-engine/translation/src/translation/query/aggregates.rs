//! Translate operations that collapse the rows into a single row.

use query_engine_metadata::metadata::ScalarType;
use query_engine_sql::sql;

use super::fields::OutputColumn;
use super::root::CurrentSelect;
use crate::translation::helpers::State;

/// `COUNT(*) AS "count"` over the current rows.
pub fn translate_count(state: &mut State, current: CurrentSelect) -> CurrentSelect {
    let mut current = if current.is_limited() || current.sealed {
        current.wrap(state)
    } else {
        current
    };
    current.columns = vec![OutputColumn {
        scalar_type: Some(ScalarType::Bigint),
        ..OutputColumn::computed(
            "count",
            sql::ast::Expression::Count(sql::ast::CountType::Star),
        )
    }];
    current.select.order_by = sql::helpers::no_ordering();
    current.base = None;
    current.object_type = None;
    current.sealed = true;
    current
}

/// Every current row as one JSON array under `key`.
pub fn translate_nest(state: &mut State, current: CurrentSelect, key: &str) -> CurrentSelect {
    let mut wrapped = current.wrap(state);
    let table = wrapped.table_reference();
    wrapped.columns = vec![OutputColumn::computed(
        key,
        sql::helpers::json_agg_rows(table),
    )];
    wrapped.object_type = None;
    wrapped.sealed = true;
    wrapped
}
