use balance::{display_value, Badge, Block, Workspace, Zone};
use std::io::{BufRead, BufReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut workspace = Workspace::new();
    let stdin = std::io::stdin();

    for line in BufReader::new(stdin.lock()).lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if let Err(e) = execute(&mut workspace, line) {
            eprintln!("Unable to run \"{}\": {}", line, e);
        }
    }

    print_scale(&workspace);

    Ok(())
}

fn execute(
    workspace: &mut Workspace,
    line: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (command, rest) = match line.find(char::is_whitespace) {
        Some(index) => (&line[..index], line[index..].trim()),
        None => (line, ""),
    };

    match command {
        "left" => add(workspace, rest, Zone::Left)?,
        "right" => add(workspace, rest, Zone::Right)?,
        "bench" => add(workspace, rest, Zone::Bench)?,
        "let" => {
            let (name, value) = rest
                .split_once('=')
                .ok_or("Expected \"let <name> = <value>\"")?;
            let value: f64 = value.trim().parse()?;
            let changed = workspace.define_variable(name, value)?;
            println!("{} = {} ({} blocks changed)", name.trim(), value, changed);
        },
        "solve" => {
            let outcome = workspace.balance()?;
            println!("{}", outcome);
        },
        "show" => print_scale(workspace),
        "reset" => workspace.reset(),
        other => return Err(format!("Unknown command, \"{}\"", other).into()),
    }

    Ok(())
}

fn add(
    workspace: &mut Workspace,
    text: &str,
    zone: Zone,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = workspace.create_block(text)?;
    workspace.move_block(id, zone)?;
    Ok(())
}

fn print_scale(workspace: &Workspace) {
    for (label, zone) in [("Left", Zone::Left), ("Right", Zone::Right)] {
        let blocks: Vec<_> = workspace.blocks_in(zone).map(describe).collect();
        println!("{}: {}", label, blocks.join(", "));
    }

    let reading = workspace.reading();

    if reading.has_undefined {
        println!("Some blocks are undefined");
    } else {
        println!(
            "{} {} {} (tilted {:.1} degrees)",
            display_value(reading.left_total),
            reading.relation,
            display_value(reading.right_total),
            reading.tilt.to_degrees()
        );
    }
}

fn describe(block: &Block) -> String {
    let text = block.display_text();

    match block.badge() {
        Badge::Literal => text,
        Badge::Computed(value) => {
            format!("{} [= {}]", text, display_value(value))
        },
        Badge::Undefined => format!("{} [?]", text),
    }
}
