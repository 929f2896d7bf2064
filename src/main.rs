use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn};
use ndarray::{Array2, ArrayView2};

use svd_image::lowrank::{image_io, Config, ReconstructionCache};

#[derive(Debug, Parser)]
#[command(name = "svd-image")]
#[command(about = "Reconstructs an image channel from its truncated SVD", long_about = None)]
struct Args {
    /// Image to decompose
    image: PathBuf,

    /// TOML or JSON file with default settings
    #[arg(long)]
    config: Option<String>,

    /// RGB channel to decompose (0, 1 or 2)
    #[arg(long)]
    channel: Option<usize>,

    /// Rank to reconstruct; repeat for several
    #[arg(short, long = "rank")]
    ranks: Vec<usize>,

    /// Upper bound on selectable ranks
    #[arg(long)]
    max_rank: Option<usize>,

    /// Directory for rendered images
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Read ranks from stdin, one per line
    #[arg(long)]
    interactive: bool,

    /// Print residual, retained energy and storage ratio per rank
    #[arg(long)]
    curve: bool,
}

/// Pulls a requested rank into `1..=bound`.
fn clamp_rank(requested: usize, bound: usize) -> usize {
    let rank = requested.clamp(1, bound);
    if rank != requested {
        warn!("rank {} out of range, using {} (max {})", requested, rank, bound);
    }
    rank
}

fn output_path(dir: &Path, stem: &str, rank: usize) -> PathBuf {
    dir.join(format!("{}_rank{}.png", stem, rank))
}

fn render(
    cache: &mut ReconstructionCache,
    matrix: &ArrayView2<f64>,
    rank: usize,
    path: &Path,
) -> eyre::Result<()> {
    let approx = cache.reconstruction(matrix, rank)?;
    save_rank(&approx, rank, path)
}

fn save_rank(approx: &Array2<f64>, rank: usize, path: &Path) -> eyre::Result<()> {
    image_io::save_gray(&approx.view(), path)?;
    info!("rank {} -> {}", rank, path.display());
    Ok(())
}

/// Renders every rank read from `input`, one per line, until EOF or `q`.
///
/// Blank lines are skipped and unparsable ones logged. Returns the ranks
/// rendered, after clamping.
fn run_interactive<R: BufRead>(
    input: R,
    cache: &mut ReconstructionCache,
    matrix: &ArrayView2<f64>,
    bound: usize,
    dir: &Path,
    stem: &str,
) -> eyre::Result<Vec<usize>> {
    let mut rendered = Vec::new();
    for line in input.lines() {
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "q" {
            break;
        }
        match input.parse::<usize>() {
            Ok(requested) => {
                let rank = clamp_rank(requested, bound);
                render(cache, matrix, rank, &output_path(dir, stem, rank))?;
                rendered.push(rank);
            }
            Err(_) => warn!("not a rank: {:?}", input),
        }
    }
    Ok(rendered)
}

fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    if let Some(channel) = args.channel {
        cfg.channel = channel;
    }
    if let Some(max_rank) = args.max_rank {
        cfg.max_rank = max_rank;
    }
    if let Some(dir) = &args.output_dir {
        cfg.output_dir = dir.clone();
    }
    cfg.validate()?;

    let matrix = image_io::load_channel(&args.image, cfg.channel)?;
    let view = matrix.view();
    let stem = args
        .image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    image_io::save_gray(&view, cfg.output_dir.join(format!("{}_original.png", stem)))?;

    let mut cache = ReconstructionCache::new(cfg.cache_capacity);
    let decomposition = cache.decomposition(&view)?;
    let bound = decomposition.rank().min(cfg.max_rank);
    info!(
        "decomposed {}x{} matrix, {} singular values, ranks 1..={} selectable",
        view.nrows(),
        view.ncols(),
        decomposition.rank(),
        bound
    );

    let requested = if args.ranks.is_empty() {
        vec![cfg.default_rank]
    } else {
        args.ranks.clone()
    };
    let ranks: Vec<usize> = requested.iter().map(|&r| clamp_rank(r, bound)).collect();
    // Batches no larger than the cache, so each one is rendered from memory.
    for chunk in ranks.chunks(cache.capacity()) {
        let batch = cache.prefetch(&view, chunk)?;
        for (&rank, approx) in chunk.iter().zip(&batch) {
            save_rank(approx, rank, &output_path(&cfg.output_dir, &stem, rank))?;
        }
    }

    if args.curve {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "rank\tresidual\tenergy\tstorage")?;
        let curve = decomposition.error_curve();
        for rank in 1..=bound {
            writeln!(
                out,
                "{}\t{:.6}\t{:.6}\t{:.6}",
                rank,
                curve[rank - 1],
                decomposition.energy_retained(rank)?,
                decomposition.storage_ratio(rank)?
            )?;
        }
    }

    if args.interactive {
        eprintln!("enter a rank in 1..={} (q to quit)", bound);
        run_interactive(
            io::stdin().lock(),
            &mut cache,
            &view,
            bound,
            &cfg.output_dir,
            &stem,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn clamps_into_slider_range() {
        assert_eq!(clamp_rank(0, 10), 1);
        assert_eq!(clamp_rank(5, 10), 5);
        assert_eq!(clamp_rank(250, 10), 10);
    }

    #[test]
    fn output_names_carry_rank() {
        let path = output_path(Path::new("out"), "goat", 50);
        assert_eq!(path, PathBuf::from("out/goat_rank50.png"));
    }

    #[test]
    fn parses_repeated_ranks() {
        let args = Args::try_parse_from([
            "svd-image", "goat.jpg", "-r", "5", "--rank", "20", "--curve",
        ])
        .unwrap();
        assert_eq!(args.ranks, vec![5, 20]);
        assert!(args.curve);
        assert!(!args.interactive);
    }

    #[test]
    fn interactive_session_renders_each_rank() {
        let matrix = Array2::from_shape_fn((4, 5), |(i, j)| ((i * 3 + j) % 5) as f64 + i as f64);
        let dir = std::env::temp_dir()
            .join(format!("svd_image_interactive_{}", std::process::id()));
        let mut cache = ReconstructionCache::new(4);
        let input = Cursor::new("3\n\n  abc \n0\n99\n3\nq\n2\n");

        let rendered =
            run_interactive(input, &mut cache, &matrix.view(), 4, &dir, "goat").unwrap();

        assert_eq!(rendered, vec![3, 1, 4, 3]);
        assert_eq!(cache.len(), 3);
        for rank in [1, 3, 4] {
            assert!(output_path(&dir, "goat", rank).exists());
        }
        assert!(!output_path(&dir, "goat", 2).exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn interactive_session_ends_at_eof() {
        let matrix = Array2::<f64>::eye(3);
        let dir = std::env::temp_dir().join(format!("svd_image_eof_{}", std::process::id()));
        let mut cache = ReconstructionCache::new(2);

        let rendered =
            run_interactive(Cursor::new(""), &mut cache, &matrix.view(), 3, &dir, "eye").unwrap();

        assert!(rendered.is_empty());
        assert!(cache.is_empty());
    }
}
