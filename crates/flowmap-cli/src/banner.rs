pub fn print_banner() {
    let banner = r#"
   __ _
  / _| | _____      ___ __ ___   __ _ _ __
 | |_| |/ _ \ \ /\ / / '_ ` _ \ / _` | '_ \
 |  _| | (_) \ V  V /| | | | | | (_| | |_) |
 |_| |_|\___/ \_/\_/ |_| |_| |_|\__,_| .__/
                                     |_|
"#;
    eprintln!(
        "{}{}",
        console::style(banner).cyan(),
        console::style(format!(
            "  network flow -> architecture archetype classifier v{}\n",
            flowmap_core::VERSION
        ))
        .dim(),
    );
}
