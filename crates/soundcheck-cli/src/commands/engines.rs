//! List the engines the factory provides.

use clap::Args;
use soundcheck_core::reference::ReferenceFactory;
use soundcheck_core::EngineFactory;

#[derive(Args)]
pub struct EnginesArgs {
    /// Also create each engine and list its parameters
    #[arg(long)]
    parameters: bool,
}

pub fn run(args: EnginesArgs) -> anyhow::Result<i32> {
    let factory = ReferenceFactory::new();
    println!("{:>4}  {:<28} {}", "id", "name", "category");
    for id in factory.engine_ids() {
        let name = factory.engine_name(id).unwrap_or("unknown");
        let category = factory.category(id).map_or("unknown", |c| c.name());
        println!("{id:>4}  {name:<28} {category}");
        if args.parameters {
            match factory.create(id) {
                Some(engine) => {
                    for index in 0..engine.num_parameters() {
                        println!("      [{index}] {}", engine.parameter_name(index));
                    }
                }
                None => println!("      (creation failed)"),
            }
        }
    }
    Ok(0)
}
