//! Serializable query plans and their SQL rendering
//!
//! [`QueryPlan`] is the translated form of a specification: plain data that
//! a store executes or renders as SQL. Rendering uses `?` placeholders with
//! the bound values returned alongside the statement.

use crate::core::entity::Entity;
use crate::core::field::FieldValue;
use crate::core::store::{SearchTerm, StoreQuery};
use crate::specification::criterion::Criterion;
use crate::specification::expressions::SortDirection;
use serde::Serialize;
use std::marker::PhantomData;

/// Change-tracking mode requested for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    #[default]
    Tracking,
    NoTracking,
    NoTrackingWithIdentityResolution,
}

/// One key of the ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// A rendered statement and its bound parameters, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

/// Store-native query built by the translated evaluators
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan<T> {
    pub filters: Vec<Criterion>,
    pub search_groups: Vec<Vec<SearchTerm>>,
    pub includes: Vec<String>,
    pub order: Vec<SortKey>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
    pub tracking: TrackingMode,
    pub split_query: bool,
    pub ignore_query_filters: bool,
    #[serde(skip)]
    _entity: PhantomData<fn() -> T>,
}

impl<T> Default for QueryPlan<T> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            search_groups: Vec::new(),
            includes: Vec::new(),
            order: Vec::new(),
            skip: None,
            take: None,
            tracking: TrackingMode::default(),
            split_query: false,
            ignore_query_filters: false,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> QueryPlan<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render as a `SELECT *` statement.
    ///
    /// `global_filters` are appended to the WHERE clause unless the plan
    /// ignores query filters. Include paths and tracking hints have no SQL
    /// form and are not rendered.
    pub fn to_sql(&self, table: &str, global_filters: &[Criterion]) -> SqlStatement {
        let mut params = Vec::new();
        let mut sql = format!("SELECT * FROM {}", quote_ident(table));
        self.push_where(&mut sql, &mut params, global_filters);

        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|k| {
                    let dir = match k.direction {
                        SortDirection::Ascending => "ASC",
                        SortDirection::Descending => "DESC",
                    };
                    format!("{} {}", quote_ident(&k.field), dir)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        match (self.take, self.skip) {
            (Some(take), skip) => {
                sql.push_str(" LIMIT ?");
                params.push(FieldValue::Integer(take as i64));
                if let Some(skip) = skip {
                    sql.push_str(" OFFSET ?");
                    params.push(FieldValue::Integer(skip as i64));
                }
            }
            (None, Some(skip)) => {
                // OFFSET requires a LIMIT; -1 means unbounded
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(FieldValue::Integer(skip as i64));
            }
            (None, None) => {}
        }

        SqlStatement { sql, params }
    }

    /// Render as a `SELECT COUNT(*)` statement over the narrowing clauses
    pub fn to_count_sql(&self, table: &str, global_filters: &[Criterion]) -> SqlStatement {
        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        self.push_where(&mut sql, &mut params, global_filters);
        SqlStatement { sql, params }
    }

    fn push_where(&self, sql: &mut String, params: &mut Vec<FieldValue>, global_filters: &[Criterion]) {
        let mut clauses = Vec::new();

        if !self.ignore_query_filters {
            for filter in global_filters {
                clauses.push(render_criterion(filter, params));
            }
        }
        for filter in &self.filters {
            clauses.push(render_criterion(filter, params));
        }
        for group in &self.search_groups {
            let terms: Vec<String> = group
                .iter()
                .map(|term| {
                    params.push(FieldValue::String(term.pattern.clone()));
                    format!("LOWER({}) LIKE LOWER(?)", quote_ident(&term.field))
                })
                .collect();
            clauses.push(format!("({})", terms.join(" OR ")));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
    }
}

impl<T: Entity> StoreQuery for QueryPlan<T> {
    type Entity = T;

    fn filter(mut self, criterion: &Criterion) -> Self {
        self.filters.push(criterion.clone());
        self
    }

    fn search(mut self, group: &[SearchTerm]) -> Self {
        if !group.is_empty() {
            self.search_groups.push(group.to_vec());
        }
        self
    }

    fn include(mut self, path: &str) -> Self {
        if !self.includes.iter().any(|p| p == path) {
            self.includes.push(path.to_string());
        }
        self
    }

    fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order.clear();
        self.order.push(SortKey {
            field: field.to_string(),
            direction,
        });
        self
    }

    fn then_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order.push(SortKey {
            field: field.to_string(),
            direction,
        });
        self
    }

    fn skip(mut self, count: usize) -> Self {
        self.take = self.take.map(|t| t.saturating_sub(count));
        self.skip = Some(self.skip.unwrap_or(0) + count);
        self
    }

    fn take(mut self, count: usize) -> Self {
        self.take = Some(self.take.map_or(count, |t| t.min(count)));
        self
    }

    fn as_no_tracking(mut self) -> Self {
        self.tracking = TrackingMode::NoTracking;
        self
    }

    fn as_no_tracking_with_identity_resolution(mut self) -> Self {
        self.tracking = TrackingMode::NoTrackingWithIdentityResolution;
        self
    }

    fn as_split_query(mut self) -> Self {
        self.split_query = true;
        self
    }

    fn ignore_query_filters(mut self) -> Self {
        self.ignore_query_filters = true;
        self
    }
}

/// Quote an identifier, one segment per dotted part
fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn render_criterion(criterion: &Criterion, params: &mut Vec<FieldValue>) -> String {
    match criterion {
        Criterion::Eq { field, value } if value.is_null() => {
            format!("{} IS NULL", quote_ident(field))
        }
        Criterion::Ne { field, value } if value.is_null() => {
            format!("{} IS NOT NULL", quote_ident(field))
        }
        Criterion::Eq { field, value } => binary(field, "=", value, params),
        // NULL <> x is unknown in SQL; a missing value still differs from x
        Criterion::Ne { field, value } => {
            params.push(value.clone());
            let column = quote_ident(field);
            format!("({} IS NULL OR {} <> ?)", column, column)
        }
        Criterion::Gt { field, value } => binary(field, ">", value, params),
        Criterion::Ge { field, value } => binary(field, ">=", value, params),
        Criterion::Lt { field, value } => binary(field, "<", value, params),
        Criterion::Le { field, value } => binary(field, "<=", value, params),
        Criterion::Like { field, pattern } => {
            params.push(FieldValue::String(pattern.clone()));
            format!("LOWER({}) LIKE LOWER(?)", quote_ident(field))
        }
        Criterion::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
        Criterion::In { field, values } => {
            let placeholders = vec!["?"; values.len()].join(", ");
            params.extend(values.iter().cloned());
            format!("{} IN ({})", quote_ident(field), placeholders)
        }
        Criterion::IsNull { field } => format!("{} IS NULL", quote_ident(field)),
        Criterion::IsNotNull { field } => format!("{} IS NOT NULL", quote_ident(field)),
        Criterion::And { criteria } if criteria.is_empty() => "1 = 1".to_string(),
        Criterion::Or { criteria } if criteria.is_empty() => "1 = 0".to_string(),
        Criterion::And { criteria } => join(criteria, " AND ", params),
        Criterion::Or { criteria } => join(criteria, " OR ", params),
        // Unknown counts as false before negating, as it does in memory
        Criterion::Not { criterion } => {
            format!("({}) IS NOT TRUE", render_criterion(criterion, params))
        }
    }
}

fn binary(field: &str, op: &str, value: &FieldValue, params: &mut Vec<FieldValue>) -> String {
    params.push(value.clone());
    format!("{} {} ?", quote_ident(field), op)
}

fn join(criteria: &[Criterion], separator: &str, params: &mut Vec<FieldValue>) -> String {
    let parts: Vec<String> = criteria
        .iter()
        .map(|c| render_criterion(c, params))
        .collect();
    format!("({})", parts.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Row {
        id: i64,
    }

    impl Entity for Row {
        fn resource_name() -> &'static str {
            "rows"
        }

        fn fields() -> &'static [&'static str] {
            &["id"]
        }

        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }

        fn field_value(&self, field: &str) -> Option<FieldValue> {
            (field == "id").then(|| self.id.into())
        }
    }

    #[test]
    fn test_renders_filters_search_order_and_paging() {
        let plan = QueryPlan::<Row>::new()
            .filter(&Criterion::eq("assigned_to", "bob"))
            .search(&[
                SearchTerm {
                    field: "title".to_string(),
                    pattern: "%login%".to_string(),
                },
                SearchTerm {
                    field: "body".to_string(),
                    pattern: "%login%".to_string(),
                },
            ])
            .order_by("created", SortDirection::Ascending)
            .then_by("id", SortDirection::Descending)
            .skip(20)
            .take(10);

        let stmt = plan.to_sql("issues", &[]);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"issues\" WHERE \"assigned_to\" = ? AND \
             (LOWER(\"title\") LIKE LOWER(?) OR LOWER(\"body\") LIKE LOWER(?)) \
             ORDER BY \"created\" ASC, \"id\" DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.params,
            vec![
                FieldValue::from("bob"),
                FieldValue::from("%login%"),
                FieldValue::from("%login%"),
                FieldValue::Integer(10),
                FieldValue::Integer(20),
            ]
        );
    }

    #[test]
    fn test_null_comparisons_and_empty_sets() {
        let plan = QueryPlan::<Row>::new()
            .filter(&Criterion::eq("closed_at", FieldValue::Null))
            .filter(&Criterion::is_in("id", Vec::<i64>::new()))
            .filter(&Criterion::ne("owner", "amy"));
        let stmt = plan.to_sql("t", &[]);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"t\" WHERE \"closed_at\" IS NULL AND 1 = 0 AND \
             (\"owner\" IS NULL OR \"owner\" <> ?)"
        );
        assert_eq!(stmt.params, vec![FieldValue::from("amy")]);
    }

    #[test]
    fn test_negation_treats_unknown_as_false() {
        let neither = Criterion::any([
            Criterion::eq("assigned_to", "bob"),
            Criterion::eq("priority", 2_i64),
        ])
        .negate();
        let stmt = QueryPlan::<Row>::new().filter(&neither).to_sql("issues", &[]);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"issues\" WHERE ((\"assigned_to\" = ? OR \"priority\" = ?)) IS NOT TRUE"
        );
        assert_eq!(
            stmt.params,
            vec![FieldValue::from("bob"), FieldValue::Integer(2)]
        );

        let stmt = QueryPlan::<Row>::new()
            .filter(&Criterion::like("title", "%x%").negate())
            .to_sql("t", &[]);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"t\" WHERE (LOWER(\"title\") LIKE LOWER(?)) IS NOT TRUE"
        );
    }

    #[test]
    fn test_global_filters_respect_ignore_flag() {
        let global = [Criterion::eq("deleted", false)];
        let plan = QueryPlan::<Row>::new();
        assert_eq!(
            plan.to_count_sql("t", &global).sql,
            "SELECT COUNT(*) FROM \"t\" WHERE \"deleted\" = ?"
        );
        let plan = plan.ignore_query_filters();
        assert_eq!(plan.to_count_sql("t", &global).sql, "SELECT COUNT(*) FROM \"t\"");
    }

    #[test]
    fn test_offset_without_limit() {
        let stmt = QueryPlan::<Row>::new().skip(5).to_sql("t", &[]);
        assert_eq!(stmt.sql, "SELECT * FROM \"t\" LIMIT -1 OFFSET ?");
    }

    #[test]
    fn test_skip_and_take_compose() {
        let plan = QueryPlan::<Row>::new().take(10).skip(4);
        assert_eq!(plan.skip, Some(4));
        assert_eq!(plan.take, Some(6));

        let plan = QueryPlan::<Row>::new().take(10).take(3);
        assert_eq!(plan.take, Some(3));
    }

    #[test]
    fn test_order_by_replaces_ordering() {
        let plan = QueryPlan::<Row>::new()
            .order_by("a", SortDirection::Ascending)
            .order_by("b", SortDirection::Descending);
        assert_eq!(plan.order.len(), 1);
        assert_eq!(plan.order[0].field, "b");
    }

    #[test]
    fn test_plan_serializes() {
        let plan = QueryPlan::<Row>::new()
            .include("project")
            .include("project")
            .as_no_tracking();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["includes"], serde_json::json!(["project"]));
        assert_eq!(json["tracking"], "no_tracking");
    }
}
