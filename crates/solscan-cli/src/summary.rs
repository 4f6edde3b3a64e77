use std::path::{Path, PathBuf};

use console::Style;
use solscan_core::pipeline::ReconstructionOptions;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            error: Style::new().red().bold(),
        }
    }
}

fn on_off(s: &Styles, flag: bool) -> String {
    if flag {
        s.method.apply_to("on").to_string()
    } else {
        s.disabled.apply_to("off").to_string()
    }
}

pub fn print_run_summary(options: &ReconstructionOptions, files: &[PathBuf]) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Solscan Reconstruction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(22)));
    println!();

    println!("  {}", s.header.apply_to("Input"));
    for file in files {
        println!("    {}", s.path.apply_to(file.display()));
    }
    if let Some(ref dir) = options.work_dir {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Output"),
            s.path.apply_to(dir.display())
        );
    }
    println!();

    // Line
    println!("  {}", s.header.apply_to("Spectral line"));
    match options.poly_fit {
        Some(ref poly) => println!(
            "    {:<14}{}",
            s.label.apply_to("Polynomial"),
            s.value.apply_to(format!("{poly:?}"))
        ),
        None => println!(
            "    {:<14}{}",
            s.label.apply_to("Polynomial"),
            s.method.apply_to("fitted")
        ),
    }
    let mode = if options.doppler { "doppler" } else { "intensity" };
    println!(
        "    {:<14}{}",
        s.label.apply_to("Mode"),
        s.method.apply_to(mode)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Offsets"),
        s.value.apply_to(format!("{:?}", options.shifts))
    );
    println!();

    // Correction
    println!("  {}", s.header.apply_to("Correction"));
    if options.transversalium && !options.doppler {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Transversal"),
            s.value.apply_to(format!("strength {}", options.trans_strength))
        );
    } else {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Transversal"),
            s.disabled.apply_to("disabled")
        );
    }
    println!("    {:<14}{}", s.label.apply_to("Mirror"), on_off(&s, options.flip_x));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Square crop"),
        on_off(&s, options.crop_width_square)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Rotation"),
        s.value.apply_to(format!("{}\u{b0}", options.rotation))
    );
    println!();

    // Output
    println!("  {}", s.header.apply_to("Output"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Disk mask"),
        on_off(&s, options.disk_display)
    );
    if options.delta_radius != 0 {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Mask radius"),
            s.value.apply_to(format!("{:+} px", options.delta_radius))
        );
    }
    println!("    {:<14}{}", s.label.apply_to("FITS"), on_off(&s, options.save_fits));
    println!(
        "    {:<14}{}",
        s.label.apply_to("CLAHE only"),
        on_off(&s, options.clahe_only)
    );
    println!();
}

pub fn print_file_done(file: &Path, outputs: &[PathBuf]) {
    let s = Styles::new();
    println!(
        "  {} {}",
        s.method.apply_to("\u{2713}"),
        s.path.apply_to(file.display())
    );
    for out in outputs {
        println!("      {}", s.label.apply_to(out.display()));
    }
}

pub fn print_file_failed(file: &Path, error: &anyhow::Error) {
    let s = Styles::new();
    println!(
        "  {} {}",
        s.error.apply_to("\u{2717}"),
        s.path.apply_to(file.display())
    );
    println!("      {}", s.error.apply_to(format!("{error:#}")));
}

pub fn print_batch_result(done: usize, failed: usize) {
    let s = Styles::new();
    println!();
    if failed == 0 {
        println!(
            "  {}",
            s.method.apply_to(format!("{done} file(s) processed"))
        );
    } else {
        println!(
            "  {} {}",
            s.value.apply_to(format!("{done} file(s) processed,")),
            s.error.apply_to(format!("{failed} failed"))
        );
    }
}
