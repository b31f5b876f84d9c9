use crate::context::ProvisionContext;
use crate::inventory::Inventory;
use anyhow::{Context, Result};
use std::fs;

const TEST_FILE: &str = "test-file.txt";
const TEST_CONTENT: &str = "test content";

/// Check that inventories can be written where a run would write them.
pub fn handle_debug_inventory(ctx: &ProvisionContext) -> Result<()> {
    println!("Debugging inventory file creation...");
    println!("Resources at: {}", ctx.resource_root()?.display());

    let dir = ctx.inventory_dir()?;
    println!("Creating inventory directory: {}", dir.display());
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let test_file = dir.join(TEST_FILE);
    println!("Creating test file: {}", test_file.display());
    fs::write(&test_file, TEST_CONTENT)
        .with_context(|| format!("Failed to write test file: {}", test_file.display()))?;
    let read_back = fs::read_to_string(&test_file)
        .with_context(|| format!("Test file missing after creation: {}", test_file.display()))?;
    if read_back != TEST_CONTENT {
        anyhow::bail!("Test file {} has unexpected content", test_file.display());
    }
    println!("✓ Test file created successfully");

    let key = ctx.ssh_private_key_file()?;
    let inventory = Inventory::placeholder(key.clone());
    let path = inventory.write(&dir)?;
    println!("✓ Inventory written to {}\n", path.display());
    print!("{}", inventory.render()?);
    if !key.exists() {
        println!(
            "\n⚠️  SSH key {} does not exist yet; it is generated on the first Kubernetes run",
            key.display()
        );
    }

    println!("\n✓ Debug test passed!");
    Ok(())
}
