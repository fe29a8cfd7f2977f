use owo_colors::OwoColorize;
use vmwatch_core::model::metric::MergedRow;
use vmwatch_core::query::VmListResponse;

pub fn print_vm_list_human(v: &VmListResponse) {
    for item in &v.items {
        let instance = item.instance_id.as_deref().unwrap_or("-");
        let state = item.provisioning_state.as_deref().unwrap_or("-");
        println!(
            "{} {} {}",
            instance.cyan(),
            item.name,
            state_label(state)
        );
    }
    println!("-- {} instances --", v.count);
}

fn state_label(state: &str) -> String {
    match state {
        "Succeeded" => state.green().to_string(),
        "Failed" => state.red().to_string(),
        _ => state.yellow().to_string(),
    }
}

/// One column per series key, one row per distinct sample instant. Missing
/// samples render as `-`.
pub fn print_merged_table(title: &str, keys: &[String], rows: &[MergedRow]) {
    println!("{title}");

    print!("{:<6}", "time");
    for key in keys {
        print!(" {key:>14}");
    }
    println!();

    for row in rows {
        print!("{:<6}", row.label);
        for key in keys {
            match row.values.get(key).copied().flatten() {
                Some(v) => print!(" {v:>14.2}"),
                None => print!(" {:>14}", "-"),
            }
        }
        println!();
    }

    println!("-- {} samples x {} series --", rows.len(), keys.len());
}
