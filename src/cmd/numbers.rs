//! Call list maintenance: `callboard list|add|remove`.

use std::path::Path;

use anyhow::Result;
use callboard::panel::models::AddOutcome;
use callboard::panel::store::StoreHandle;

pub async fn cmd_list(numbers_file: &Path) -> Result<()> {
    let numbers = StoreHandle::open(numbers_file).list().await?;
    if numbers.is_empty() {
        println!("No numbers in {}", numbers_file.display());
        return Ok(());
    }
    for number in &numbers {
        println!("{}", number);
    }
    Ok(())
}

pub async fn cmd_add(numbers_file: &Path, raw: &str) -> Result<()> {
    let (number, outcome) = StoreHandle::open(numbers_file).add(raw).await?;
    match outcome {
        AddOutcome::Added => println!("Number {} added successfully!", number),
        AddOutcome::AlreadyPresent => println!("Number {} already exists!", number),
    }
    Ok(())
}

pub async fn cmd_remove(numbers_file: &Path, number: &str) -> Result<()> {
    let number = number.trim();
    if StoreHandle::open(numbers_file).remove(number).await? {
        println!("Number {} removed successfully!", number);
    } else {
        println!("Number {} is not in the call list", number);
    }
    Ok(())
}
