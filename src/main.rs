use clap::Parser;
use cutlist_optimizer::cutlist;
use cutlist_optimizer::guillotine::ScoreStrategy;
use cutlist_optimizer::packer::PackOptions;
use cutlist_optimizer::render;
use cutlist_optimizer::types::{
    BandEdges, Grain, Lamination, LayoutResult, PartSpec, StockSheetSpec, UnplacedReason,
};

#[derive(Parser)]
#[command(
    name = "cutlist_optimizer",
    about = "Guillotine cutlist layout optimizer for sheet stock"
)]
struct Cli {
    /// Stock classes as [id=]LxW:qty[:kerf] (e.g. board=2750x1830:10:3)
    #[arg(long = "stock", num_args = 1..)]
    stock: Vec<String>,

    /// Parts as id=LxW:qty[,grain=length|width][,band=tblr|all][,lam=same-board|with-backer|custom]
    #[arg(long = "part", num_args = 1..)]
    parts: Vec<String>,

    /// Blade kerf width in mm for classes without a :kerf suffix (default: 0)
    #[arg(long, default_value_t = 0)]
    kerf: u32,

    /// Disable rotation of grain-free parts
    #[arg(long)]
    no_rotate: bool,

    /// Never open more than one sheet
    #[arg(long)]
    single_sheet: bool,

    /// Fit heuristic: best-area-fit, best-short-side-fit, or best-long-side-fit
    #[arg(long, default_value = "best-area-fit", value_parser = parse_strategy)]
    strategy: ScoreStrategy,

    /// Show ASCII layout of each sheet
    #[arg(long)]
    layout: bool,
}

fn parse_strategy(s: &str) -> Result<ScoreStrategy, String> {
    match s {
        "best-area-fit" => Ok(ScoreStrategy::BestAreaFit),
        "best-short-side-fit" => Ok(ScoreStrategy::BestShortSideFit),
        "best-long-side-fit" => Ok(ScoreStrategy::BestLongSideFit),
        _ => Err(format!(
            "invalid strategy '{}', expected: best-area-fit, best-short-side-fit, or best-long-side-fit",
            s
        )),
    }
}

fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected LxW", s));
    }
    let length = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    let width = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    if length == 0 || width == 0 {
        return Err(format!("dimensions must be non-zero in '{}'", s));
    }
    Ok((length, width))
}

fn parse_dims_qty(s: &str) -> Result<(u32, u32, u32), String> {
    let (dims, qty) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid spec '{}', expected LxW:qty", s))?;
    let (length, width) = parse_dimensions(dims)?;
    let qty = qty
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    Ok((length, width, qty))
}

fn parse_stock(s: &str, fallback_id: &str, default_kerf: u32) -> Result<StockSheetSpec, String> {
    let (id, spec) = match s.split_once('=') {
        Some((id, spec)) => (id.to_string(), spec),
        None => (fallback_id.to_string(), s),
    };
    let mut fields = spec.split(':');
    let dims = fields
        .next()
        .ok_or_else(|| format!("invalid stock '{}', expected LxW:qty[:kerf]", s))?;
    let (length_mm, width_mm) = parse_dimensions(dims)?;
    let qty = fields
        .next()
        .ok_or_else(|| format!("invalid stock '{}', expected LxW:qty[:kerf]", s))?
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    let kerf_mm = match fields.next() {
        Some(kerf) => kerf
            .parse::<u32>()
            .map_err(|_| format!("invalid kerf in '{}'", s))?,
        None => default_kerf,
    };
    if fields.next().is_some() {
        return Err(format!("invalid stock '{}', expected LxW:qty[:kerf]", s));
    }
    Ok(StockSheetSpec {
        id,
        length_mm,
        width_mm,
        qty,
        kerf_mm,
    })
}

fn parse_band(s: &str) -> Result<BandEdges, String> {
    if s == "all" {
        return Ok(BandEdges::all());
    }
    let mut edges = BandEdges::none();
    for ch in s.chars() {
        match ch {
            't' => edges.top = true,
            'b' => edges.bottom = true,
            'l' => edges.left = true,
            'r' => edges.right = true,
            _ => return Err(format!("invalid band edge '{}', expected t, b, l, r", ch)),
        }
    }
    Ok(edges)
}

fn parse_part(s: &str) -> Result<PartSpec, String> {
    let (id, rest) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid part '{}', expected id=LxW:qty[,...]", s))?;
    let mut fields = rest.split(',');
    let core = fields
        .next()
        .ok_or_else(|| format!("invalid part '{}'", s))?;
    let (length_mm, width_mm, qty) = parse_dims_qty(core)?;

    let mut part = PartSpec {
        id: id.to_string(),
        length_mm,
        width_mm,
        qty,
        grain: Grain::Any,
        band_edges: BandEdges::none(),
        lamination: Lamination::None,
        material_id: None,
    };

    for field in fields {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| format!("invalid part attribute '{}' in '{}'", field, s))?;
        match key {
            "grain" => {
                part.grain = match value {
                    "any" => Grain::Any,
                    "length" => Grain::Length,
                    "width" => Grain::Width,
                    _ => return Err(format!("invalid grain '{}' in '{}'", value, s)),
                }
            }
            "band" => part.band_edges = parse_band(value)?,
            "lam" => {
                part.lamination = match value {
                    "none" => Lamination::None,
                    "same-board" => Lamination::SameBoard,
                    "with-backer" => Lamination::WithBacker,
                    "custom" => Lamination::Custom,
                    _ => return Err(format!("invalid lamination '{}' in '{}'", value, s)),
                }
            }
            "material" => part.material_id = Some(value.to_string()),
            _ => return Err(format!("unknown part attribute '{}' in '{}'", key, s)),
        }
    }

    Ok(part)
}

fn print_result(label: &str, result: &LayoutResult, show_layout: bool) {
    for sheet in &result.sheets {
        println!(
            "{} sheet {} ({}, {}x{}):",
            label,
            sheet.index + 1,
            sheet.sheet_id,
            sheet.length_mm,
            sheet.width_mm
        );
        for p in &sheet.placements {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!("  {} @ ({}, {}) {}x{}{}", p.part_id, p.x, p.y, p.w, p.h, rot);
        }
        if show_layout {
            print!("{}", render::render_sheet(sheet));
        }
        println!();
    }

    for u in &result.unplaced {
        let reason = match u.reason {
            UnplacedReason::TooLargeForSheet => "too large for sheet",
            UnplacedReason::NoCapacity => "no capacity",
        };
        println!("Unplaced: {} x{} ({})", u.part_id, u.count, reason);
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.stock.is_empty() {
        eprintln!("Error: at least one --stock class is required");
        std::process::exit(1);
    }

    let stock: Vec<StockSheetSpec> = cli
        .stock
        .iter()
        .enumerate()
        .map(|(i, s)| parse_stock(s, &format!("stock-{}", i + 1), cli.kerf))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let parts: Vec<PartSpec> = cli
        .parts
        .iter()
        .map(|p| parse_part(p))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let options = PackOptions {
        allow_rotation: !cli.no_rotate,
        single_sheet_only: cli.single_sheet,
        strategy: cli.strategy,
    };

    let plan = cutlist::plan(&parts, &stock, options);

    print_result("Primary", &plan.primary, cli.layout);
    if let Some(backer) = &plan.backer {
        println!("--- Backer pass ---");
        print_result("Backer", backer, cli.layout);
    }

    let stats = &plan.primary.stats;
    println!(
        "Summary: {} sheet{} used, {:.1}% waste, banding 16mm: {}mm, 32mm: {}mm",
        plan.primary.sheet_count(),
        if plan.primary.sheet_count() == 1 {
            ""
        } else {
            "s"
        },
        plan.primary.waste_percent(),
        stats.edgebanding_16mm_mm,
        stats.edgebanding_32mm_mm,
    );
}
