//! Subcommands. Each one drives the same form controllers a graphical view
//! would: mount, edit the draft, submit or remove, then report the status.

use std::io::Write;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use fleet_core::{
    App, AuthForm, AuthMode, Brand, Decimal, EntityForm, EntityId, Segment, Status, Stored, TokenStorage,
    Transport, Vehicle,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session token.
    Login(CredentialArgs),
    /// Create an account, then log in with it.
    Register(CredentialArgs),
    /// Forget the stored session token.
    Logout,
    /// Show the logged-in user.
    Profile,
    /// Manage segments.
    #[command(subcommand)]
    Segment(NamedAction),
    /// Manage brands.
    #[command(subcommand)]
    Brand(NamedAction),
    /// Manage vehicles.
    #[command(subcommand)]
    Vehicle(VehicleAction),
}

#[derive(Debug, Args)]
pub struct CredentialArgs {
    pub username: String,
    #[arg(long, env = "FLEET_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Actions for entities that only carry a name.
#[derive(Debug, Subcommand)]
pub enum NamedAction {
    List,
    Add { name: String },
    Rename { id: EntityId, name: String },
    Delete { id: EntityId },
}

#[derive(Debug, Subcommand)]
pub enum VehicleAction {
    List,
    Add {
        name: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        segment: EntityId,
        #[arg(long)]
        brand: EntityId,
    },
    Update {
        id: EntityId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        segment: Option<EntityId>,
        #[arg(long)]
        brand: Option<EntityId>,
    },
    Delete { id: EntityId },
}

/// Records edited through a single name field.
trait Named: Stored {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
}

impl Named for Segment {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Named for Brand {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

pub fn run<T: Transport, S: TokenStorage>(app: &mut App<T, S>, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Login(args) => authenticate(app, AuthMode::Login, args, out),
        Command::Register(args) => authenticate(app, AuthMode::Register, args, out),
        Command::Logout => {
            app.logout();
            writeln!(out, "Logged out")?;
            Ok(())
        }
        Command::Profile => {
            let profile = app.fetch_profile()?;
            writeln!(out, "#{} {}", profile.id, profile.username)?;
            Ok(())
        }
        Command::Segment(action) => run_named::<Segment, _, _>(app, action, out),
        Command::Brand(action) => run_named::<Brand, _, _>(app, action, out),
        Command::Vehicle(action) => run_vehicle(app, action, out),
    }
}

fn authenticate<T: Transport, S: TokenStorage>(
    app: &mut App<T, S>,
    mode: AuthMode,
    args: CredentialArgs,
    out: &mut impl Write,
) -> Result<()> {
    let mut form = AuthForm::new(mode);
    form.submit(app, &args.username, &args.password);
    report(form.status(), out)
}

fn run_named<E: Named, T: Transport, S: TokenStorage>(
    app: &mut App<T, S>,
    action: NamedAction,
    out: &mut impl Write,
) -> Result<()> {
    let mut form = EntityForm::<E>::new();
    match action {
        NamedAction::List => {
            mount(&mut form, app, out)?;
            for record in app.entities().items::<E>() {
                writeln!(out, "{:>4}  {}", record.id(), record.name())?;
            }
            Ok(())
        }
        NamedAction::Add { name } => {
            form.edit(app, |record| record.set_name(name));
            form.submit(app);
            report(form.status(), out)
        }
        NamedAction::Rename { id, name } => {
            mount(&mut form, app, out)?;
            if !form.begin_edit(app, id) {
                bail!("no {} with id {id}", E::KIND);
            }
            form.edit(app, |record| record.set_name(name));
            form.submit(app);
            report(form.status(), out)
        }
        NamedAction::Delete { id } => {
            // Load vehicles first so the local cascade has something to act on.
            let mut vehicles = EntityForm::<Vehicle>::new();
            mount(&mut vehicles, app, out)?;
            let before = app.entities().items::<Vehicle>().len();
            form.remove(app, id);
            report(form.status(), out)?;
            let removed = before.saturating_sub(app.entities().items::<Vehicle>().len());
            if removed > 0 {
                writeln!(out, "Removed {removed} dependent vehicle(s)")?;
            }
            Ok(())
        }
    }
}

fn run_vehicle<T: Transport, S: TokenStorage>(
    app: &mut App<T, S>,
    action: VehicleAction,
    out: &mut impl Write,
) -> Result<()> {
    let mut form = EntityForm::<Vehicle>::new();
    match action {
        VehicleAction::List => {
            mount(&mut form, app, out)?;
            for v in app.entities().items::<Vehicle>() {
                writeln!(
                    out,
                    "{:>4}  {} ({}) ${}  [{} / {}]",
                    v.id, v.name, v.release_year, v.price, v.segment_name, v.brand_name
                )?;
            }
            Ok(())
        }
        VehicleAction::Add {
            name,
            year,
            price,
            segment,
            brand,
        } => {
            form.edit(app, |v| {
                v.name = name;
                if let Some(year) = year {
                    v.release_year = year;
                }
                v.price = price;
                v.segment_id = segment;
                v.brand_id = brand;
            });
            form.submit(app);
            report(form.status(), out)
        }
        VehicleAction::Update {
            id,
            name,
            year,
            price,
            segment,
            brand,
        } => {
            mount(&mut form, app, out)?;
            if !form.begin_edit(app, id) {
                bail!("no vehicle with id {id}");
            }
            form.edit(app, |v| {
                if let Some(name) = name {
                    v.name = name;
                }
                if let Some(year) = year {
                    v.release_year = year;
                }
                if let Some(price) = price {
                    v.price = price;
                }
                if let Some(segment) = segment {
                    v.segment_id = segment;
                }
                if let Some(brand) = brand {
                    v.brand_id = brand;
                }
            });
            form.submit(app);
            report(form.status(), out)
        }
        VehicleAction::Delete { id } => {
            form.remove(app, id);
            report(form.status(), out)
        }
    }
}

fn mount<E: Stored, T: Transport, S: TokenStorage>(
    form: &mut EntityForm<E>,
    app: &mut App<T, S>,
    out: &mut impl Write,
) -> Result<()> {
    if form.mount(app) {
        Ok(())
    } else {
        report(form.status(), out)
    }
}

/// Print a success status, or turn a failure into an error.
fn report(status: Option<&Status>, out: &mut impl Write) -> Result<()> {
    match status {
        Some(Status::Success(msg)) => {
            writeln!(out, "{msg}")?;
            Ok(())
        }
        Some(Status::Failure(msg)) => Err(anyhow!("{msg}")),
        None => Ok(()),
    }
}
