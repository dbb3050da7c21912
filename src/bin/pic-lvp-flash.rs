#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate pic16_lvp_flash;
use pic16_lvp_flash::*;

use std::process::exit;

use pic16_lvp_flash::asm::Assembler;
use pic16_lvp_flash::config::{
	address,
	PinMap,
};
use pic16_lvp_flash::gpio::{
	GpioBank,
	Lines,
	RpiGpio,
	SimTarget,
};
use pic16_lvp_flash::icsp::Session;
use pic16_lvp_flash::programmer::Plan;

// decimal, or hexadecimal with "0x" prefix
fn parse_number(s: &str) -> AResult<u32> {
	let r = if s.starts_with("0x") || s.starts_with("0X") {
		u32::from_str_radix(&s[2..], 16)
	} else {
		s.parse::<u32>()
	};
	r.map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid number {:?}: {}", s, e);
		e.context(msg).into()
	})
}

fn get_param(matches: &clap::ArgMatches, name: &str) -> AResult<Option<u32>> {
	match matches.value_of(name) {
		None => Ok(None),
		Some(p) => parse_number(p).map(Some).map_err(|e| {
			let msg = format!("invalid parameter {}: {}", name, e);
			e.context(msg).into()
		}),
	}
}

fn get_pin(matches: &clap::ArgMatches, name: &str, default: u8) -> AResult<u8> {
	match get_param(matches, name)? {
		None => Ok(default),
		Some(p) if p < 54 => Ok(p as u8),
		Some(p) => bail!("invalid parameter {}: no BCM GPIO {}", name, p),
	}
}

fn pin_map(matches: &clap::ArgMatches) -> AResult<PinMap> {
	let default = PinMap::default();
	let power = if matches.is_present("no_power") {
		None
	} else {
		Some(get_pin(matches, "power", default.power.unwrap_or(22))?)
	};
	Ok(PinMap {
		mclr: get_pin(matches, "mclr", default.mclr)?,
		clock: get_pin(matches, "clock", default.clock)?,
		data: get_pin(matches, "data", default.data)?,
		power,
	})
}

fn info<L: Lines>(session: &mut Session<L>) -> AResult<()> {
	if let Some(device) = session.device() {
		println!("{}", device);
		println!("{}", device.characteristics);
	}
	println!("{}", session.device_information()?);
	Ok(())
}

fn read<L: Lines>(session: &mut Session<L>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let start = match get_param(sub_m, "ADDRESS")? {
		Some(a) => a,
		None => bail!("missing parameter ADDRESS"),
	};
	let count = get_param(sub_m, "COUNT")?.unwrap_or(1) as usize;
	let words = session.read_words(start, count)?;
	for (index, line) in words.chunks(8).enumerate() {
		let hex: Vec<String> = line.iter().map(|w| format!("{:04x}", w)).collect();
		println!("{:04x}: {}", start as usize + index * 8, hex.join(" "));
	}
	Ok(())
}

fn flash<L: Lines>(session: &mut Session<L>, matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let pin = get_param(matches, "pin")?.unwrap_or(2);
	ensure!(pin < 8, "invalid parameter pin: RA{} doesn't exist", pin);

	let mut user_ids = Vec::new();
	if let Some(values) = sub_m.values_of("user_id") {
		for v in values {
			let id = parse_number(v)?;
			ensure!(id <= 0x3fff, "user ID 0x{:x} wider than 14 bits", id);
			user_ids.push(id as u16);
		}
	}

	let mut image = Assembler::new(session.geometry());
	firmware::blink(&mut image, pin as u8)?;

	let plan = Plan {
		erase: sub_m.is_present("erase"),
		user_ids,
		configuration: if sub_m.is_present("skip_config") {
			None
		} else {
			Some(firmware::CONFIGURATION.to_vec())
		},
	};
	programmer::program(session, &mut image, &plan)?;
	info!("Target programmed");
	Ok(())
}

fn run<L: Lines>(lines: L, matches: &clap::ArgMatches) -> AResult<()> {
	let mut session = Session::with_defaults(lines);
	session.open()?;

	let result = match matches.subcommand() {
		("info", _) => info(&mut session),
		("erase", _) => {
			info!("Erasing device");
			session.set_program_counter(address::USER_ID)
				.and_then(|_| session.bulk_erase())
		},
		("read", Some(sub_m)) => read(&mut session, sub_m),
		("flash", Some(sub_m)) => flash(&mut session, matches, sub_m),
		("", _) => Err(format_err!("no subcommand")),
		(cmd, _) => Err(format_err!("not implemented subcommand {:?}", cmd)),
	};

	session.release();
	result
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg mclr: --mclr +takes_value +global "BCM GPIO wired to MCLR (default 9)")
		(@arg clock: --clock +takes_value +global "BCM GPIO wired to ICSPCLK (default 11)")
		(@arg data: --data +takes_value +global "BCM GPIO wired to ICSPDAT (default 10)")
		(@arg power: --power +takes_value +global "BCM GPIO switching target VDD (default 22)")
		(@arg no_power: --("no-power") +global "target is powered externally")
		(@arg devmem: --devmem +global "map GPIO registers through /dev/mem instead of /dev/gpiomem")
		(@arg simulate: --simulate +global "talk to a simulated blank target instead of real hardware")
		(@arg pin: --pin +takes_value +global "PORTA pin toggled by the flashed program (default 2)")
		(@subcommand info =>
			(about: "show device ID, revision and device information area")
		)
		(@subcommand erase =>
			(about: "bulk erase program memory, user IDs and configuration")
		)
		(@subcommand read =>
			(about: "dump NVM words")
			(@arg ADDRESS: +required "word address (0x prefix for hex)")
			(@arg COUNT: "number of words (default 1)")
		)
		(@subcommand flash =>
			(about: "program the blink test program and configuration")
			(@arg erase: --erase "bulk erase first")
			(@arg skip_config: --("skip-config") "don't write configuration words")
			(@arg user_id: --("user-id") +takes_value +multiple "user ID word (up to 4)")
		)
	).get_matches();

	if matches.is_present("simulate") {
		return run(SimTarget::new(), &matches);
	}

	let pins = pin_map(&matches)?;
	let bank = if matches.is_present("devmem") {
		GpioBank::devmem()
	} else {
		GpioBank::gpiomem()
	};
	let lines = RpiGpio::open(bank, pins)?;
	run(lines, &matches)
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
