use trino_drift::{Statement, TrinoClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("TRINO_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned());

    let client = TrinoClient::new(url, "trino").with_defaults("mysql", "default");

    let status = client.test_connection().await;
    println!("{}", status.message);

    let catalogs = client.list_catalogs().await?;
    for row in &catalogs.rows {
        println!("catalog: {}", row.get_str("Catalog").unwrap_or("?"));
    }

    let result = client
        .execute(
            &Statement::new("SELECT table_name FROM information_schema.tables LIMIT 10")
                .with_catalog("system"),
        )
        .await?;

    for row in result.rows {
        println!("{row:?}");
    }

    Ok(())
}
