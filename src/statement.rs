/// SQL text plus optional catalog/schema overrides.
///
/// Overrides take precedence over the client defaults when the statement is
/// submitted. Statements are cacheable unless marked with
/// [`Statement::uncached`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Statement {
    sql: String,
    catalog: Option<String>,
    schema: Option<String>,
    cacheable: bool,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            catalog: None,
            schema: None,
            cacheable: true,
        }
    }

    /// Runs the statement against `catalog` instead of the client default.
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Runs the statement against `schema` instead of the client default.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Always runs against the engine, even when the client caches results.
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}
