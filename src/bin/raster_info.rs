use georef::Error;
use std::env;
use std::path::Path;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        println!("Usage: <filename>");
        return Err(Error::InvalidData(
            "Missing commandline argument".to_string(),
        ));
    }

    let filename = &args[1];
    let reader = georef::open(Path::new(filename)).await?;
    let info = reader.info();
    println!(
        "raster width={}, height={}, nbands={}, data_type={:?}",
        info.width, info.height, info.nbands, info.data_type
    );
    match reader.georeference() {
        Some(georeference) => {
            println!("crs: {:?}", georeference.crs);
            println!("transform: {:?}", georeference.transform);
        }
        None => println!("not georeferenced"),
    }
    Ok(())
}
