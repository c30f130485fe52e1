use anyhow::{Context, Result};
use skycast_core::App;
use skycast_weather::{ForecastEntry, Outcome, WeatherError, WeatherRecord};

struct Args {
    coordinate: Option<(f64, f64)>,
    refresh: bool,
}

fn parse_args() -> Result<Args> {
    let mut refresh = false;
    let mut positional = Vec::new();

    for arg in std::env::args().skip(1) {
        if arg == "--refresh" {
            refresh = true;
        } else {
            positional.push(arg);
        }
    }

    let coordinate = match positional.as_slice() {
        [] => None,
        [lat, lon] => Some((
            lat.parse().with_context(|| format!("Invalid latitude: {}", lat))?,
            lon.parse().with_context(|| format!("Invalid longitude: {}", lon))?,
        )),
        _ => anyhow::bail!("Usage: skycast [LAT LON] [--refresh]"),
    };

    Ok(Args {
        coordinate,
        refresh,
    })
}

/// Friendly text followed by the classified message, e.g.
/// "Weather API key is invalid. Check settings. (Invalid API key)"
fn describe_error(e: &WeatherError) -> String {
    if e.message().is_empty() {
        e.user_message().to_string()
    } else {
        format!("{} ({})", e.user_message(), e.message())
    }
}

fn print_current(record: &WeatherRecord) {
    println!(
        "  {}: {:.1}°C (feels like {:.1}°C), {}",
        record.city_name, record.temperature, record.feels_like, record.description
    );
    println!(
        "  Low {:.1}°C / High {:.1}°C, humidity {}%, wind {:.1} m/s, clouds {}%",
        record.min_temp, record.max_temp, record.humidity, record.wind_speed, record.cloudiness
    );
    if let (Some(rise), Some(set)) = (record.sunrise_time(), record.sunset_time()) {
        println!("  Sunrise {} / Sunset {} UTC", rise.format("%H:%M"), set.format("%H:%M"));
    }
    if let Some(updated) = record.updated_at() {
        println!("  Updated {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

fn print_forecast(entries: &[ForecastEntry]) {
    for entry in entries {
        let when = entry
            .period_start()
            .map(|t| t.format("%a %H:%M").to_string())
            .unwrap_or_else(|| entry.date.to_string());
        println!(
            "  {}  {:>5.1}°C  {}",
            when, entry.temperature, entry.description
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;
    let args = parse_args()?;

    let mut app = App::new()?;
    if let Some((lat, lon)) = args.coordinate {
        app.set_location(lat, lon)?;
    }

    tracing::info!("SkyCast started");

    let coordinator = app.coordinator().clone();
    let coord = app.location();

    if let Some(last) = coordinator.last_known_weather().await {
        println!("Last known weather:");
        print_current(&last);
        println!();
    }

    if args.refresh {
        if let Err(e) = coordinator.refresh_weather(coord).await {
            eprintln!("Refresh failed: {}", describe_error(&e));
        } else {
            println!("Weather updated");
        }
    }

    println!("Current weather for {}:", coord);
    let mut current = coordinator.get_current_weather(coord, args.refresh);
    while let Some(outcome) = current.next().await {
        match outcome {
            Outcome::Loading => println!("  Loading..."),
            Outcome::Success(record) => print_current(&record),
            Outcome::Error(e) => {
                eprintln!("  {}", describe_error(&e));
            }
        }
    }

    println!("\nForecast:");
    match coordinator.get_forecast(coord, args.refresh).terminal().await {
        Some(Outcome::Success(entries)) => print_forecast(&entries),
        Some(Outcome::Error(e)) => eprintln!("  {}", describe_error(&e)),
        _ => {}
    }

    app.shutdown();
    Ok(())
}
