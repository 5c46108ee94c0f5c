use charsmith_core::schema::character_schema;
use charsmith_core::store::to_pretty_json;

pub fn run() -> anyhow::Result<()> {
    println!("{}", to_pretty_json(&character_schema().to_json_schema())?);
    Ok(())
}
