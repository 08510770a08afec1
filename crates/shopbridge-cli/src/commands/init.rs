//! Initialize a new Shopbridge project

use anyhow::Result;
use shopbridge_core::config::PROJECT_FILE;
use std::fs;
use std::path::Path;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(PROJECT_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            PROJECT_FILE
        );
    }

    tracing::info!("Creating new Shopbridge project: {}", project_name);

    for dir in ["connectors", "transformers", "connections", "data"] {
        fs::create_dir_all(project_dir.join(dir))?;
    }

    let config = format!(
        r#"# Shopbridge Project Configuration
name: {project_name}
version: "0.1.0"

runtime:
  # Minimum similarity for generated mappings
  auto_map_threshold: 0.7
  # Records inspected by schema discovery (0 = all)
  discovery_max_samples: 10
  # Recent errors kept per scheduled job
  error_history: 10
"#
    );
    fs::write(project_dir.join(PROJECT_FILE), config)?;

    // Referenced as "file.products" and "file.listings"
    let connectors = r#"# Connector configurations
products:
  type: file
  path: data/products.jsonl
  format: jsonl

listings:
  type: file
  path: data/listings.jsonl
  format: jsonl
  schema:
    entity_name: listings
    fields:
      sku:
        id: listings.sku
        name: sku
        type: string
        path: sku
      title:
        id: listings.title
        name: title
        type: string
        path: title
      price:
        id: listings.price
        name: price
        type: number
        path: price
      quantity:
        id: listings.quantity
        name: quantity
        type: integer
        path: quantity
      image:
        id: listings.image
        name: image
        type: string
        path: image
"#;
    fs::write(project_dir.join("connectors/file.yaml"), connectors)?;

    let transformer = r#"# Regenerate with: shopbridge map --source file.products --target file.listings
id: products_to_listings
name: Products to listings
mappings:
  - source_field: id
    target_field: sku
  - source_field: regular_price
    target_field: price
  - source_field: stock_quantity
    target_field: quantity
  - source_field: images
    target_field: image
functions:
  - name: concatenate
    target_field: title
    args: [name, "' - '", brand]
"#;
    fs::write(
        project_dir.join("transformers/products_to_listings.yaml"),
        transformer,
    )?;

    let connection = r#"id: products_to_listings
description: Publish shop products as marketplace listings
source: file.products
target: file.listings
transformer: products_to_listings
schedule: "15m"
query:
  status: publish
triggers:
  - source: shop
    event: product.updated
"#;
    fs::write(
        project_dir.join("connections/products_to_listings.yaml"),
        connection,
    )?;

    let gitignore = r#"# Output files
data/listings*.jsonl

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    let sample_data = r#"{"id": "101", "name": "Enamel mug", "brand": "Camp", "status": "publish", "regular_price": "12.50", "stock_quantity": "40", "images": [{"src": "https://cdn.example.com/mug.jpg"}]}
{"id": "102", "name": "Steel plate", "brand": "Camp", "status": "publish", "regular_price": "9", "stock_quantity": "15", "images": []}
{"id": "103", "name": "Prototype bowl", "brand": "Camp", "status": "draft", "regular_price": "7.25", "stock_quantity": "0", "images": []}
"#;
    fs::write(project_dir.join("data/products.jsonl"), sample_data)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  shopbridge validate                    # Check configuration");
    tracing::info!("  shopbridge discover file.products      # Inspect the source schema");
    tracing::info!("  shopbridge run --once                  # Run every connection once");

    Ok(())
}
