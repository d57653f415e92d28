extern crate clap;
extern crate log;
extern crate pretty_env_logger;

use clap::{App, Arg};
use darkflight::atmosphere::history::AtmosphereHistory;
use darkflight::atmosphere::Atmosphere;
use darkflight::dynamics::darkflight::{DarkflightState, DynamicsConfig};
use darkflight::dynamics::shape::Shape;
use darkflight::ensemble::montecarlo::{jitter_c_ml, jitter_shape, jitter_velocity_direction, uniform_fractional};
use darkflight::ensemble::{configuration, particles, triangulation, ParticleSeed, VelocityModel};
use darkflight::errors::{DarkflightError, Result};
use darkflight::io::event_file;
use darkflight::io::output::{write_result, NullSink, OutputSinks};
use darkflight::io::wind_file;
use darkflight::parallel::run_ensemble;
use darkflight::propagators::dormand_prince::{integrate, AcceptedStep, IntegratorProfile, StepCommand};
use darkflight::propagators::events::{backtrack_to_surface, check_termination};
use darkflight::result::{assemble_row, ErrorBudgets, OutputRow, RunMetadata};
use darkflight::terrain::{ConstantGround, GroundHeightSource, SrtmGround};
use darkflight::time::jd_to_iso;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env::{set_var, var};
use std::path::{Path, PathBuf};
use std::process::exit;

const LOG_VAR: &str = "DARKFLIGHT_LOG";

fn main() {
    if var(LOG_VAR).is_err() {
        set_var(LOG_VAR, "INFO");
    }
    if pretty_env_logger::try_init_custom_env(LOG_VAR).is_err() {
        eprintln!("could not init logger");
    }

    match run() {
        Ok(()) => exit(0),
        Err(e) => {
            log::error!("{}", e);
            exit(e.exit_code());
        }
    }
}

fn build_app<'a, 'b>() -> App<'a, 'b> {
    App::new("darkflight")
        .version("0.1.0")
        .about("Meteoroid dark-flight propagator: atmospheric descent to impact or full ablation")
        .arg(Arg::with_name("event").short("e").takes_value(true).required(true).help("Event file"))
        .arg(Arg::with_name("wind").short("w").takes_value(true).help("Wind file"))
        .arg(
            Arg::with_name("velocity_model")
                .short("v")
                .takes_value(true)
                .possible_values(&["eks", "grits", "raw"])
                .help("Velocity model (required for tabular event file)"),
        )
        .arg(Arg::with_name("mass").short("m").takes_value(true).help("Nominal mass (kg)"))
        .arg(Arg::with_name("density").short("d").takes_value(true).default_value("3500.0").help("Bulk density (kg/m^3)"))
        .arg(Arg::with_name("shape").short("s").takes_value(true).default_value("s").help("Shape: s, c, b, or a float"))
        .arg(Arg::with_name("ground").short("g").takes_value(true).default_value("0.0").help("Ground height (m), or 'a' for auto (SRTM)"))
        .arg(Arg::with_name("no_kml").short("k").help("Disable KML output"))
        .arg(Arg::with_name("geojson").short("J").help("Emit GeoJSON alongside KML"))
        .arg(Arg::with_name("keyword").short("K").takes_value(true).help("Keyword appended to output directory"))
        .arg(Arg::with_name("mc").long("mc").takes_value(true).default_value("0").help("Monte-Carlo sample count"))
        .arg(Arg::with_name("mass_err").long("me").takes_value(true).default_value("0.1").help("Mass error budget"))
        .arg(Arg::with_name("shape_err").long("se").takes_value(true).default_value("0.15").help("Shape error budget"))
        .arg(Arg::with_name("wind_err").long("we").takes_value(true).default_value("2.0").help("Wind-speed error budget"))
        .arg(Arg::with_name("lift").short("l").takes_value(true).default_value("0.0").help("Lift coefficient"))
}

fn run() -> Result<()> {
    let matches = build_app().get_matches();

    let event_path = PathBuf::from(matches.value_of("event").unwrap());
    let rho_bulk: f64 = parse_flag(&matches, "density")?;
    let shape_code = Shape::parse(matches.value_of("shape").unwrap())?;
    let mc: usize = parse_flag(&matches, "mc")?;
    let mass_err: f64 = parse_flag(&matches, "mass_err")?;
    let shape_err: f64 = parse_flag(&matches, "shape_err")?;
    let wind_err: f64 = parse_flag(&matches, "wind_err")?;
    let c_lift: f64 = parse_flag(&matches, "lift")?;
    let nominal_mass: Option<f64> = matches.value_of("mass").map(|v| v.parse()).transpose()
        .map_err(|_| DarkflightError::ArgumentInvalid("invalid -m mass".into()))?;

    // c_ml = sigma * cd_hyp(shape); the CLI exposes the bulk density and
    // shape directly, so the mass-loss coefficient is derived the way
    // `ensemble::particles` derives it from a loaded snapshot's columns.
    let c_ml = darkflight::dynamics::mass_loss::mass_loss_coefficient(rho_bulk, darkflight::dynamics::drag::cd_hypersonic(shape_code.factor()));

    let mut rng = StdRng::from_entropy();
    let atmosphere = build_atmosphere(matches.value_of("wind"))?;
    let atmosphere_source = matches.value_of("wind").unwrap_or("none").to_string();

    let seeds = build_ensemble(
        &event_path, &matches, shape_code, rho_bulk, c_ml, nominal_mass, mc, mass_err, shape_err, wind_err, &atmosphere, &mut rng,
    )?;

    let ground_spec = matches.value_of("ground").unwrap();
    let emit_full_trajectory = seeds.len() == 1;

    let results: Vec<Option<Vec<OutputRow>>> = run_ensemble(&seeds, num_cpus_hint(), |(seed, atmosphere)| {
        let mut history = if emit_full_trajectory { AtmosphereHistory::default() } else { AtmosphereHistory::with_capacity(8) };
        let mut ground = build_ground(ground_spec);
        propagate_one(seed, atmosphere, &mut history, ground.as_mut(), c_lift, emit_full_trajectory).ok()
    });

    let rows: Vec<OutputRow> = results.into_iter().flatten().flatten().collect();

    let meta = RunMetadata::new(atmosphere_source, shape_code, jd_to_iso(seeds.first().map_or(2_451_545.0, |(s, _)| s.t0_jd)))
        .with_error_budgets(ErrorBudgets { mass: Some(mass_err), shape: Some(shape_err), wind_speed: Some(wind_err) });

    let stem = output_stem(&event_path, matches.value_of("keyword"));
    let out_path = write_result(&stem, &rows, &meta, seeds.len())?;
    log::info!("wrote {} rows to {}", rows.len(), out_path.display());

    if !matches.is_present("no_kml") {
        let mut sink = NullSink;
        sink.write_kml(&rows)?;
        if matches.is_present("geojson") {
            sink.write_geojson(&rows)?;
        }
    }

    Ok(())
}

fn parse_flag<T: std::str::FromStr>(matches: &clap::ArgMatches<'_>, name: &str) -> Result<T> {
    matches
        .value_of(name)
        .unwrap()
        .parse()
        .map_err(|_| DarkflightError::ArgumentInvalid(format!("invalid value for -{}", name)))
}

/// Builds the initial ensemble paired with the atmosphere each particle
/// should propagate through: `base_atmosphere` unperturbed outside a
/// Monte-Carlo expansion, or a fresh `Atmosphere::jittered` draw per MC
/// realisation (`spec.md` 4.G's wind jitter).
#[allow(clippy::too_many_arguments)]
fn build_ensemble(
    event_path: &Path,
    matches: &clap::ArgMatches<'_>,
    shape_code: Shape,
    rho_bulk: f64,
    c_ml: f64,
    nominal_mass: Option<f64>,
    mc: usize,
    mass_err: f64,
    shape_err: f64,
    wind_err: f64,
    base_atmosphere: &Atmosphere,
    rng: &mut StdRng,
) -> Result<Vec<(ParticleSeed, Atmosphere)>> {
    let ext = event_path.extension().and_then(|e| e.to_str()).unwrap_or("");

    // ra/dec sigma for the velocity-direction jitter: the triangulation
    // metadata's own error estimate when present (`spec.md` 4.G), else the
    // `-we` wind-error budget as a fallback for modes with no such metadata.
    let mut ra_dec_sigma_deg = (wind_err, wind_err);

    let base_seeds = match ext {
        "ecsv" | "csv" => {
            let velocity_model = matches
                .value_of("velocity_model")
                .and_then(VelocityModel::parse)
                .ok_or_else(|| DarkflightError::ArgumentInvalid("-v is required for a tabular event file".into()))?;
            let rows = event_file::read_triangulation_rows(event_path)?;
            let meta = event_file::read_triangulation_meta(event_path)?;
            if let (Some(ra), Some(dec)) = (meta.ra_eci_inf_err_deg, meta.dec_eci_inf_err_deg) {
                ra_dec_sigma_deg = (ra, dec);
            }
            let masses = match nominal_mass {
                Some(m) => vec![m],
                None => darkflight::ensemble::default_fall_line_masses(),
            };
            triangulation::build(&rows, &meta, velocity_model, &masses, rho_bulk, shape_code, c_ml, 1.0)?
        }
        "fits" => {
            let rows = load_particle_rows_fits(event_path)?;
            particles::build(&rows)?
        }
        "particles" => {
            let rows = event_file::read_particle_rows(event_path)?;
            particles::build(&rows)?
        }
        "cfg" | "ini" | "toml" => {
            let (met, mc_section) = event_file::read_configuration(event_path)?;
            configuration::build(&met, &mc_section, shape_code, c_ml, mc, rng)?
        }
        other => {
            return Err(DarkflightError::ArgumentInvalid(format!("unrecognised event file extension: {}", other)));
        }
    };

    // Configuration mode samples its own Monte-Carlo ensemble internally;
    // triangulation/particle mode expand here using the CLI error budgets,
    // per `spec.md` §6's `-mc`/`-me`/`-se`/`-we` flags.
    if matches!(ext, "cfg" | "ini" | "toml") || mc == 0 {
        return Ok(base_seeds.into_iter().map(|seed| (seed, base_atmosphere.clone())).collect());
    }

    let (ra_sigma, dec_sigma) = ra_dec_sigma_deg;
    let mut expanded = Vec::with_capacity(base_seeds.len() * mc);
    for seed in &base_seeds {
        for _ in 0..mc {
            let mass = uniform_fractional(rng, seed.mass, mass_err);
            let shape = jitter_shape(rng, seed.shape, shape_err);
            let vel_eci = jitter_velocity_direction(rng, seed.vel_eci, ra_sigma, dec_sigma);
            let c_ml = jitter_c_ml(rng, seed.c_ml);
            let atmosphere = base_atmosphere.jittered(rng, wind_err);
            expanded.push((ParticleSeed { mass, shape, vel_eci, c_ml, ..*seed }, atmosphere));
        }
    }
    Ok(expanded)
}

#[cfg(feature = "fits-output")]
fn load_particle_rows_fits(path: &Path) -> Result<Vec<darkflight::io::types::ParticleRow>> {
    event_file::read_particle_rows_fits(path)
}

#[cfg(not(feature = "fits-output"))]
fn load_particle_rows_fits(_path: &Path) -> Result<Vec<darkflight::io::types::ParticleRow>> {
    Err(DarkflightError::ArgumentInvalid(
        "a .fits particle-snapshot event file requires the fits-output feature".into(),
    ))
}

fn build_atmosphere(wind_path: Option<&str>) -> Result<Atmosphere> {
    let Some(path) = wind_path else { return Ok(Atmosphere::none()) };
    let path = Path::new(path);
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => {
            let sounding = wind_file::read_sounding(path)?;
            Ok(Atmosphere::with_sounding(sounding))
        }
        _ => {
            let grid = wind_file::read_grid_snapshot(path)?;
            Ok(Atmosphere::with_grid(grid))
        }
    }
}

fn build_ground(spec: &str) -> Box<dyn GroundHeightSource> {
    if spec == "a" {
        Box::new(SrtmGround::new(Box::new(|lat, lon| {
            log::warn!("SRTM tile cache not wired to a real dataset; ({}, {}) substituting 0 m", lat, lon);
            None
        })))
    } else {
        let height_m = spec.parse().unwrap_or(0.0);
        Box::new(ConstantGround { height_m })
    }
}

fn propagate_one(
    seed: &ParticleSeed,
    atmosphere: &Atmosphere,
    history: &mut AtmosphereHistory,
    ground: &mut dyn GroundHeightSource,
    c_lift: f64,
    emit_full_trajectory: bool,
) -> Result<Vec<OutputRow>> {
    let config = DynamicsConfig { atmosphere, t0_jd: seed.t0_jd, c_lift, luminosity_weight: None };
    let profile = IntegratorProfile::select(c_lift);

    let initial_state = DarkflightState {
        pos_eci: seed.pos_eci,
        vel_eci: seed.vel_eci,
        mass: seed.mass,
        rho_bulk: seed.rho_bulk,
        shape_factor: seed.shape.factor(),
        c_ml: seed.c_ml,
    };

    let mut steps: Vec<AcceptedStep> = Vec::new();
    integrate(initial_state, &config, profile, history, |t, state| {
        match check_termination(t, state, seed.t0_jd, ground) {
            Some(_) => StepCommand::Terminate,
            None => StepCommand::Continue,
        }
    }, &mut steps)?;

    if steps.len() >= 2 {
        let last = steps[steps.len() - 1];
        let prev = steps[steps.len() - 2];
        if check_termination(last.t, &last.state, seed.t0_jd, ground).is_some() {
            let t_jd = seed.t0_jd + last.t / 86_400.0;
            let ecef = darkflight::frames::eci2ecef_pos(darkflight::frames::Eci(last.state.pos_eci), t_jd);
            let llh = darkflight::frames::ecef2llh(ecef);
            let ground_radius = darkflight::frames::earth_radius(llh.lat) + ground.height_m(llh.lat, llh.lon);
            let (t, state) = backtrack_to_surface(prev.t, &prev.state, last.t, &last.state, ground_radius);
            let idx = steps.len() - 1;
            steps[idx] = AcceptedStep { t, state, output: last.output };
        }
    }

    if emit_full_trajectory {
        Ok(steps
            .iter()
            .map(|s| assemble_row(seed.t0_jd, s.t, &s.state, seed, s.output.abs_magnitude))
            .collect())
    } else if let Some(last) = steps.last() {
        Ok(vec![assemble_row(seed.t0_jd, last.t, &last.state, seed, last.output.abs_magnitude)])
    } else {
        Ok(Vec::new())
    }
}

fn output_stem(event_path: &Path, keyword: Option<&str>) -> PathBuf {
    let dir = event_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = event_path.file_stem().and_then(|s| s.to_str()).unwrap_or("darkflight");
    let tag = keyword.unwrap_or("darkflight");
    dir.join(format!("{}_darkflight_{}_run0", stem, tag))
}

fn num_cpus_hint() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
