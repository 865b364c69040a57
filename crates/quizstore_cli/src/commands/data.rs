//! Record access commands.

use super::parse_collection;
use quizstore_core::QuizStore;
use serde_json::Value;

/// Prints one record's payload as pretty JSON.
pub async fn get(
    store: &QuizStore,
    collection: &str,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = parse_collection(collection)?;
    match store.get(collection, id).await? {
        Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
        None => return Err(format!("No record {collection}/{id}").into()),
    }
    Ok(())
}

/// Writes one record from a JSON string.
pub async fn set(
    store: &QuizStore,
    collection: &str,
    id: &str,
    json: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = parse_collection(collection)?;
    let payload: Value = serde_json::from_str(json)?;
    store.set(collection, id, payload).await?;
    println!("✓ Wrote {collection}/{id}");
    Ok(())
}

/// Removes one record.
pub async fn remove(
    store: &QuizStore,
    collection: &str,
    id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let collection = parse_collection(collection)?;
    if store.remove(collection, id).await? {
        println!("✓ Removed {collection}/{id}");
    } else {
        println!("Nothing to remove at {collection}/{id}");
    }
    Ok(())
}

/// Lists the records of a collection.
pub async fn list(store: &QuizStore, collection: &str) -> Result<(), Box<dyn std::error::Error>> {
    let collection = parse_collection(collection)?;
    let records = store.list_all(collection).await?;

    println!("{} record(s) in {}", records.len(), collection);
    for record in &records {
        println!(
            "  {:<24} {:>8} bytes  written {}  v{}",
            record.id,
            record.encoded_size(),
            record.written_at.format("%Y-%m-%d %H:%M:%S"),
            record.schema_version
        );
    }
    Ok(())
}
