use warehouse_layout::*;

fn main() {
    let config = LayoutConfig::default();
    let layout = match Layout::new(config, RackDimensions::default(), DEFAULT_AISLE_OFFSET) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Failed to build layout: {}", e);
            return;
        }
    };

    println!("Warehouse grid:");
    println!("  Streets:          {}", config.streets);
    println!("  Racks per street: {}", config.racks_per_street);
    println!("  Levels:           {}", config.levels);
    println!("  Slots per level:  {}", config.slots_per_level);
    println!("  Capacity:         {} slots", config.capacity());
    println!();

    // First rack of every street, ground level.
    for street in 1..=config.streets {
        let address = WarehouseAddress::new(street, 1, 1, 1);
        match (layout.position_of(&address), layout.aisle_standoff_of(&address)) {
            (Ok(slot), Ok(standoff)) => {
                println!("{:>10}: slot {}  standoff {}", address.to_string(), slot, standoff)
            }
            (Err(e), _) | (_, Err(e)) => eprintln!("{}: {}", address, e),
        }
    }

    let outside = WarehouseAddress::new(config.streets + 1, 1, 1, 1);
    if let Err(e) = layout.position_of(&outside) {
        println!();
        println!("{} rejected: {}", outside, e);
    }
}
