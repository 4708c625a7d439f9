//! Type definitions of a SQL AST representation.

#[derive(Debug, Clone, PartialEq)]
pub enum Explain<'a> {
    Select(&'a Select),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub select_list: SelectList,
    pub from: Option<From>,
    pub where_: Where,
    pub group_by: GroupBy,
    pub order_by: OrderBy,
    pub limit: Limit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    SelectList(Vec<(ColumnAlias, Expression)>),
    Select1,
}

#[derive(Debug, Clone, PartialEq)]
pub enum From {
    Table {
        reference: TableReference,
        alias: TableAlias,
    },
    Select {
        select: Box<Select>,
        alias: TableAlias,
    },
    /// `UNION ALL` of selects that produce the same columns.
    Union {
        selects: Vec<Select>,
        alias: TableAlias,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Where(pub Expression);

#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub target: Expression,
    pub direction: OrderByDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limit {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
    BinaryOperation {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    BinaryArrayOperation {
        left: Box<Expression>,
        operator: BinaryArrayOperator,
        right: Vec<Expression>,
    },
    UnaryOperation {
        expression: Box<Expression>,
        operator: UnaryOperator,
    },
    FunctionCall {
        function: Function,
        args: Vec<Expression>,
    },
    Exists {
        select: Box<Select>,
    },
    /// A select that returns a single value, used inside a select list.
    CorrelatedSubSelect(Box<Select>),
    RowToJson(TableReference),
    ColumnReference(ColumnReference),
    Value(Value),
    Cast {
        expression: Box<Expression>,
        r#type: ScalarType,
    },
    Count(CountType),
}

/// The name of a database type, rendered as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarType(pub String);

/// A comparison operator, rendered as-is between its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOperator(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryArrayOperator {
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    IsNull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Coalesce,
    JsonAgg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountType {
    Star,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i64),
    Float8(f64),
    Bool(bool),
    /// Sent as a query parameter.
    String(String),
    Null,
    EmptyJsonArray,
}

/// aliases that we give to relations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAlias {
    pub unique_index: u64,
    pub name: String,
}

/// aliases that we give to columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnAlias {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableReference {
    /// refers to a db table object name
    DBTable {
        schema: Option<String>,
        table: String,
    },
    /// refers to an alias we created
    AliasedTable(TableAlias),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnReference {
    /// refers to a db column object name
    TableColumn {
        table: TableReference,
        name: String,
    },
    /// refers to an alias we created
    AliasedColumn {
        table: TableReference,
        column: ColumnAlias,
    },
}
