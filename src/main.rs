//! The `myfs` shell: an interactive front-end over a volume image.

use myfs::device::FileDevice;
use myfs::error::Error;
use myfs::fs::FileSystem;
use myfs::path::normalize;
use myfs::path::split_path;
use myfs::prompt::Prompt;
use std::fmt;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

/// Backing image used when none is given on the command line.
const DEFAULT_IMAGE: &str = "myfs.bin";

// Console colors
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const BOLDBLUE: &str = "\x1b[01;34m";

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// If true, print command line help.
    help: bool,
    /// The path to the backing image.
    image: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut res: Args = Default::default();
    for arg in std::env::args_os().skip(1) {
        match arg.to_str() {
            Some("-h" | "--help") => res.help = true,
            _ => res.image = Some(PathBuf::from(arg)),
        }
    }
    res
}

/// Prints command usage.
fn print_help() {
    println!("Usage:");
    println!(" myfs [options] [image]");
    println!();
    println!("Opens the volume stored in `image` (default: {DEFAULT_IMAGE}) and starts an");
    println!("interactive shell on it. A missing image is created and formatted.");
    println!();
    println!("Options:");
    println!(" -h, --help\tPrints help.");
}

/// Writes an error to stderr, then exits.
fn error<M: fmt::Display>(bin: &str, msg: M) -> ! {
    eprintln!("{bin}: error: {msg}");
    exit(1);
}

fn paint(colors: bool, code: &str, text: &str) -> String {
    if colors {
        format!("{code}{text}{RESET}")
    } else {
        text.to_owned()
    }
}

/// Prints help for the shell's internal commands.
fn print_cmd_help(colors: bool) {
    let rows = [
        ("ls [dir]", "Lists directory content."),
        ("tr", "Prints every entry on the volume."),
        ("cat <path>", "Shows file content."),
        ("touch <path>", "Creates an empty file."),
        ("mkdir <path>", "Creates an empty directory."),
        ("cd <path>", "Changes the current directory."),
        ("rm <path>", "Removes a file or a directory tree."),
        ("edit <path>", "Replaces file content."),
        ("mv <src> <dst>", "Moves an entry."),
        ("cp <src> <dst>", "Copies an entry."),
        ("defrag", "Compacts the data region."),
        ("help", "Shows this help message."),
        ("exit", "Gracefully exit."),
    ];
    println!();
    for (cmd, desc) in rows {
        println!(
            "{} {}",
            paint(colors, MAGENTA, &format!("{cmd:<16}")),
            paint(colors, YELLOW, desc)
        );
    }
    println!();
}

fn missing_operand(cmd: &str) -> Result<(), Error> {
    eprintln!("{cmd}: missing operand");
    Ok(())
}

fn handle_cmd(
    fs: &mut FileSystem,
    cur_dir: &mut String,
    line: &str,
    colors: bool,
) -> Result<(), Error> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Ok(());
    };
    let args: Vec<&str> = parts.collect();
    match cmd {
        "ls" => {
            let dir = match args.first() {
                Some(a) => normalize(a, cur_dir),
                None => cur_dir.clone(),
            };
            for entry in fs.list_dir(&dir)? {
                let (_, name) = split_path(&entry.path);
                if entry.is_directory() {
                    println!("{}", paint(colors, BOLDBLUE, name));
                } else {
                    println!("{name}");
                }
            }
        }
        "tr" => {
            for entry in fs.list_tree() {
                let kind = if entry.is_directory() { 'd' } else { 'f' };
                println!("{kind} {:>8}  {}", entry.size, entry.path);
            }
        }
        "cat" => {
            let Some(a) = args.first() else {
                return missing_operand(cmd);
            };
            let content = fs.get_content(&normalize(a, cur_dir))?;
            let mut out = io::stdout().lock();
            let _ = out.write_all(&content);
            if !content.ends_with(b"\n") {
                let _ = out.write_all(b"\n");
            }
        }
        "touch" => {
            let Some(a) = args.first() else {
                return missing_operand(cmd);
            };
            fs.create_file(&normalize(a, cur_dir))?;
        }
        "mkdir" => {
            let Some(a) = args.first() else {
                return missing_operand(cmd);
            };
            fs.create_directory(&normalize(a, cur_dir))?;
        }
        "cd" => {
            let target = match args.first() {
                Some(a) => normalize(a, cur_dir),
                None => "/".to_owned(),
            };
            let entry = fs.get_entry(&target).ok_or(Error::NotFound)?;
            if !entry.is_directory() {
                return Err(Error::NotADirectory);
            }
            *cur_dir = target;
        }
        "rm" => {
            let Some(a) = args.first() else {
                return missing_operand(cmd);
            };
            fs.remove(&normalize(a, cur_dir))?;
        }
        "edit" => {
            let Some(a) = args.first() else {
                return missing_operand(cmd);
            };
            let target = normalize(a, cur_dir);
            if !fs.exists(&target) {
                fs.create_file(&target)?;
            }
            println!("enter new content; finish with a single `.` line");
            let mut content = String::new();
            for input in io::stdin().lock().lines() {
                let Ok(input) = input else {
                    break;
                };
                if input == "." {
                    break;
                }
                content.push_str(&input);
                content.push('\n');
            }
            fs.set_content(&target, content.as_bytes())?;
        }
        "mv" | "cp" => {
            let (Some(src), Some(dst)) = (args.first(), args.get(1)) else {
                return missing_operand(cmd);
            };
            let src = normalize(src, cur_dir);
            let dst = normalize(dst, cur_dir);
            if cmd == "mv" {
                fs.rename(&src, &dst)?;
            } else {
                fs.copy(&src, &dst)?;
            }
        }
        "defrag" => fs.defrag()?,
        "help" => print_cmd_help(colors),
        _ => eprintln!("{cmd}: unknown command"),
    }
    Ok(())
}

fn main() {
    let args = parse_args();
    if args.help {
        print_help();
        exit(0);
    }
    let image = args.image.unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE));
    let mut dev = FileDevice::open(&image).unwrap_or_else(|e| {
        error("myfs", format_args!("{}: {e}", image.display()));
    });
    let mut fs = FileSystem::new(&mut dev).unwrap_or_else(|e| {
        error("myfs", format_args!("cannot mount {}: {e}", image.display()));
    });
    let colors = unsafe { libc::isatty(libc::STDOUT_FILENO) } == 1;
    let mut prompt = Prompt::new();
    let mut cur_dir = String::from("/");
    while let Some(line) = prompt.read_line(&format!("{cur_dir}> ")) {
        let line = line.trim().to_owned();
        if line == "exit" {
            break;
        }
        if let Err(e) = handle_cmd(&mut fs, &mut cur_dir, &line, colors) {
            let cmd = line.split_whitespace().next().unwrap_or("myfs");
            eprintln!("{}", paint(colors, RED, &format!("{cmd}: {e}")));
        }
    }
}
