// Reads one pass of a segmentation dataset and reports its label statistics.
//
// Usage:
//   ferrite-seg <pipeline.json>
//
// Prints per-class pixel frequencies and median-frequency class weights that
// can be pasted into the pipeline file's `loss.class_weighting`.
use std::error::Error;
use std::process::ExitCode;

use ferrite_seg::{Blob, LabelStats, Layer, PipelineSpec};
use log::info;

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: ferrite-seg <pipeline.json>");
        return ExitCode::from(2);
    };

    match run(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ferrite-seg: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str) -> Result<(), Box<dyn Error>> {
    let spec = PipelineSpec::load_json(path)?;
    info!("pipeline `{}` ({} classes)", spec.name, spec.num_classes);

    let mut layer = spec.data_layer();
    let mut top = vec![Blob::default(), Blob::default()];
    layer.setup(&[], &mut top)?;

    let mut stats = LabelStats::new(spec.num_classes, spec.loss.ignore_label);
    let mut seen = 0;
    while seen < layer.len() {
        layer.forward(&[], &mut top)?;
        // The last batch may wrap around into pairs already counted.
        let take = top[1].num().min(layer.len() - seen);
        let plane = top[1].count() / top[1].num();
        stats.accumulate_values(&top[1].data()[..take * plane])?;
        seen += take;
    }

    println!("{} pairs, {} labelled pixels", seen, stats.total());
    println!("{:>6} {:>12} {:>10} {:>10}", "class", "pixels", "freq", "weight");
    let weights = stats.median_frequency_weights();
    for (c, (count, freq)) in stats.counts().iter().zip(stats.frequencies()).enumerate() {
        println!("{:>6} {:>12} {:>10.6} {:>10.4}", c, count, freq, weights[c]);
    }
    println!("\"class_weighting\": {}", serde_json::to_string(&weights)?);
    Ok(())
}
