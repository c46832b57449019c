//! The dialect statement builder trait.

use objectspace_core::{
    ChangeSet, ClassDescriptor, ComparisonOperator, DELETED_FIELD, EntityInstance, LogicOperator,
    PropertyDescriptor, Result, Value, ValueCodec, WhereClause,
};

/// Builds dialect-specific statement text from metadata and criteria.
///
/// A driver implements the operator tokens, name escaping, and the five
/// statement shapes; [`render_clause`](StatementBuilder::render_clause) and
/// [`select_clause`](StatementBuilder::select_clause) are provided and walk
/// the criteria AST with those pieces.
pub trait StatementBuilder {
    /// The codec used to embed literal values in statement text.
    fn codec(&self) -> &dyn ValueCodec;

    /// Escape an identifier for the dialect.
    fn escape_name(&self, name: &str) -> String;

    /// The dialect token for a comparison operator.
    fn comparison_token(&self, operator: ComparisonOperator) -> &'static str;

    /// The dialect token for a logical operator.
    fn logic_token(&self, operator: LogicOperator) -> &'static str;

    /// SELECT over the kind's table restricted by the criteria.
    ///
    /// Unless `include_deleted` is set, the emitted statement must also
    /// filter out soft-deleted rows.
    fn build_select(
        &self,
        class: &ClassDescriptor,
        clause: Option<&WhereClause>,
        include_deleted: bool,
    ) -> Result<String>;

    /// INSERT for a new entity row: scalar columns with non-NULL values.
    fn build_insert(&self, class: &ClassDescriptor, entity: &EntityInstance) -> Result<String>;

    /// UPDATE applying one change set, keyed by primary key.
    fn build_update(&self, class: &ClassDescriptor, change: &ChangeSet) -> Result<String>;

    /// CREATE TABLE for the kind, including foreign-key definitions.
    fn build_create_table(&self, class: &ClassDescriptor) -> Result<String>;

    /// ALTER TABLE ... ADD for one missing column.
    fn build_add_column(
        &self,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
    ) -> Result<String>;

    /// Render a criteria tree as dialect text.
    ///
    /// Leaves become `( name OP literal )`; inner nodes parenthesize their
    /// operands, so composition order is preserved exactly.
    fn render_clause(&self, clause: &WhereClause) -> String {
        match clause {
            WhereClause::Compare {
                property,
                operator,
                value,
            } => format!(
                "( {}{}{} )",
                self.escape_name(property),
                self.comparison_token(*operator),
                self.codec().encode(value)
            ),
            WhereClause::Combine {
                left,
                right,
                operator,
            } => format!(
                "( {}{}{} )",
                self.render_clause(left),
                self.logic_token(*operator),
                self.render_clause(right)
            ),
        }
    }

    /// The effective filter for a select: the caller's criteria, AND-ed with
    /// the soft-delete filter unless deleted rows were asked for.
    fn select_clause(
        &self,
        clause: Option<&WhereClause>,
        include_deleted: bool,
    ) -> Option<WhereClause> {
        if include_deleted {
            return clause.cloned();
        }
        let alive = WhereClause::equals(DELETED_FIELD, Value::Bool(false));
        Some(alive.and_opt(clause.cloned()))
    }
}
