use anyhow::{bail, Result};

use lectura_lib::rubric::{CriticalLiteracyRubric, RubricDimension, RubricLookup};

use crate::OutputFormat;

pub fn run(dimension: Option<&str>, format: &OutputFormat) -> Result<()> {
    let rubric = CriticalLiteracyRubric::new();
    let dimensions: Vec<&RubricDimension> = match dimension {
        Some(name) => {
            let key = rubric.resolve_dimension(name);
            match rubric.dimension(&key) {
                Some(d) => vec![d],
                None => bail!("Unknown dimension '{}'", name),
            }
        }
        None => rubric.dimensions().collect(),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&dimensions)?);
        }
        OutputFormat::Plain => {
            for (i, d) in dimensions.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{} ({})", d.nombre, d.key);
                println!("{}", d.descripcion);

                println!("\nCriterios");
                for c in d.criterios {
                    println!("  - {}", c);
                }
                println!("\nNiveles");
                for (level, descriptor) in d.niveles.iter().enumerate() {
                    println!("  {}. {}", level + 1, descriptor);
                }
                println!("\nPreguntas guía");
                for q in d.preguntas_guia {
                    println!("  ? {}", q);
                }
            }
        }
    }

    Ok(())
}
