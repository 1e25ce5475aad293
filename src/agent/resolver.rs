//! Intent Resolver
//!
//! Maps a free-text question to one SQL statement. Rules are tried top to
//! bottom over the lower-cased question; the first rule whose predicate holds
//! builds the statement. Trigger words are plain substrings.

use tracing::debug;

pub const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master WHERE type='table'";

/// Returned when the database has no tables. Never reaches storage.
pub const NO_TABLES_SQL: &str = "SELECT 'No tables available' as message";

/// What a rule gets to look at.
pub struct ResolveContext<'a> {
    pub question: &'a str,
    pub known_tables: &'a [String],
}

impl ResolveContext<'_> {
    fn mentions(&self, word: &str) -> bool {
        self.question.contains(word)
    }

    fn mentions_any(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.mentions(w))
    }

    fn has_table(&self, table: &str) -> bool {
        self.known_tables.iter().any(|t| t == table)
    }
}

/// One rung of the ladder.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&ResolveContext) -> bool,
    pub build: fn(&ResolveContext) -> String,
}

fn mentions_customers(ctx: &ResolveContext) -> bool {
    ctx.mentions("customers") && ctx.has_table("customers")
}

fn mentions_orders(ctx: &ResolveContext) -> bool {
    ctx.mentions("orders") && ctx.has_table("orders")
}

/// Precedence is the slice order.
pub static RULES: &[Rule] = &[
    Rule {
        name: "list_tables",
        applies: |ctx| ctx.mentions("tables"),
        build: |_| LIST_TABLES_SQL.to_string(),
    },
    Rule {
        name: "customer_count",
        applies: |ctx| mentions_customers(ctx) && ctx.mentions_any(&["count", "how many"]),
        build: |_| "SELECT COUNT(*) as customer_count FROM customers".to_string(),
    },
    Rule {
        name: "top_customers",
        applies: |ctx| mentions_customers(ctx) && ctx.mentions_any(&["top", "best"]),
        build: |_| "SELECT * FROM customers LIMIT 5".to_string(),
    },
    Rule {
        name: "customers",
        applies: mentions_customers,
        build: |_| "SELECT * FROM customers LIMIT 10".to_string(),
    },
    Rule {
        name: "order_total",
        applies: |ctx| mentions_orders(ctx) && ctx.mentions_any(&["total", "sum"]),
        build: |_| "SELECT SUM(price * quantity) as total_revenue FROM orders".to_string(),
    },
    Rule {
        name: "recent_orders",
        applies: |ctx| mentions_orders(ctx) && ctx.mentions_any(&["recent", "latest"]),
        build: |_| "SELECT * FROM orders ORDER BY order_date DESC LIMIT 5".to_string(),
    },
    Rule {
        name: "orders",
        applies: mentions_orders,
        build: |_| "SELECT * FROM orders LIMIT 10".to_string(),
    },
    Rule {
        name: "revenue_by_product",
        applies: |ctx| ctx.mentions_any(&["revenue", "sales"]) && ctx.has_table("orders"),
        build: |_| {
            "SELECT product, SUM(price * quantity) as revenue FROM orders GROUP BY product ORDER BY revenue DESC"
                .to_string()
        },
    },
    Rule {
        name: "sample_first_table",
        applies: |ctx| !ctx.known_tables.is_empty(),
        build: |ctx| format!("SELECT * FROM {} LIMIT 5", ctx.known_tables[0]),
    },
];

/// Pick the statement for `question` given the tables currently in the database.
pub fn resolve(question: &str, known_tables: &[String]) -> String {
    let lowered = question.to_lowercase();
    let ctx = ResolveContext {
        question: &lowered,
        known_tables,
    };

    for rule in RULES {
        if (rule.applies)(&ctx) {
            let sql = (rule.build)(&ctx);
            debug!("Rule '{}' matched: {}", rule.name, sql);
            return sql;
        }
    }

    NO_TABLES_SQL.to_string()
}
