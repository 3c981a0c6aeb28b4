use std::{env, path::PathBuf, process::ExitCode};

use log::{error, info, warn};

use neural_style_transfer::{
    Result, TransferConfig,
    arch::Normalization,
    imageio,
    pretrained::{IMAGENET_MEAN, IMAGENET_STD, load_vgg19, vgg19},
    run_style_transfer,
};

struct Args {
    content: PathBuf,
    style: PathBuf,
    output: PathBuf,
    weights: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Option<Args> {
    let mut positional = Vec::new();
    let mut weights = None;
    let mut config = None;

    let mut argv = env::args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--weights" => weights = Some(PathBuf::from(argv.next()?)),
            "--config" => config = Some(PathBuf::from(argv.next()?)),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let [content, style, output] = <[PathBuf; 3]>::try_from(positional).ok()?;
    Some(Args {
        content,
        style,
        output,
        weights,
        config,
    })
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => TransferConfig::from_json(path)?,
        None => TransferConfig::default(),
    };

    let content_img = imageio::load_image(&args.content, config.image_size)?;
    let style_img = imageio::load_image(&args.style, config.image_size)?;

    let layers = match &args.weights {
        Some(path) => load_vgg19(path)?,
        None => {
            warn!("no --weights given, using randomly initialized features");
            vgg19()
        }
    };
    let normalization = Normalization::new(IMAGENET_MEAN, IMAGENET_STD);

    let output = run_style_transfer(layers, normalization, &content_img, &style_img, &config)?;
    imageio::save_image(&output, &args.output)?;
    info!("wrote {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(args) = parse_args() else {
        eprintln!(
            "usage: neural-style-transfer <content> <style> <output> [--weights FILE] [--config FILE]"
        );
        return ExitCode::FAILURE;
    };

    if let Err(e) = run(&args) {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
