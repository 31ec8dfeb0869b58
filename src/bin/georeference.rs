use georef::gcp::GroundControlPoint;
use georef::{vec2f, AffineTransform, Crs, Error};
use std::env;
use std::path::Path;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 3 {
        println!("Usage: <input> <output> <epsg> <col,row,x,y> [<col,row,x,y> ...]");
        return Err(Error::InvalidData(
            "Missing commandline argument".to_string(),
        ));
    }

    let input = Path::new(&args[1]);
    let output = Path::new(&args[2]);
    let crs = Crs::parse(&args[3])?;
    let mut gcps: Vec<GroundControlPoint> = vec![];
    for arg in &args[4..] {
        let fields: Vec<f64> = arg
            .split(',')
            .map(|v| v.parse::<f64>().unwrap())
            .collect();
        if fields.len() != 4 {
            return Err(Error::InvalidData(format!(
                "Expected col,row,x,y - got {:?}",
                arg
            )));
        }
        gcps.push(GroundControlPoint {
            pixel: vec2f(fields[0], fields[1]),
            geo: vec2f(fields[2], fields[3]),
        });
    }

    let transform = AffineTransform::from_gcps(&gcps)?;
    println!(
        "transform: {}",
        serde_json::to_string(&transform).unwrap()
    );
    println!("rms residual: {}", transform.rms_residual(&gcps));
    georef::rewrite::rewrite(input, output, &transform, crs).await?;
    println!("wrote {}", output.display());
    Ok(())
}
