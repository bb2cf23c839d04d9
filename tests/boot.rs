use std::{
    io::{self, Cursor, Write},
    path::PathBuf,
    sync::Arc,
};

use parking_lot::Mutex;

use minikernel::{
    config::{BootConfig, DiskModel},
    kernel::{console::StreamConsole, program::ProgramRegistry},
    programs::standard_registry,
    ErrorCode, Interrupt, Kernel, Library, PowerOn,
};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        let bytes = self.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn temp_image() -> PathBuf {
    std::env::temp_dir().join(format!("minikernel-boot-{}.img", uuid::Uuid::new_v4()))
}

fn boot_with(config: &BootConfig, input: &str) -> (i32, String) {
    boot_programs(config, standard_registry(), input)
}

fn boot_programs(config: &BootConfig, programs: ProgramRegistry, input: &str) -> (i32, String) {
    let out = Captured::default();
    let console = Arc::new(StreamConsole::new(Cursor::new(input.to_string()), out.clone()));
    let kernel = Kernel::new(console, programs);
    let rc = kernel.interrupt(Interrupt::PowerOn(PowerOn {
        cache_size: config.cache_size,
        disk: config.build_disk().expect("disk"),
        shell_command: config.shell_command(),
    }));
    (rc, out.text())
}

fn config(model: DiskModel, image: &PathBuf) -> BootConfig {
    BootConfig {
        disk_model: model,
        disk_size: 12,
        image: image.clone(),
        ..BootConfig::default()
    }
}

const SESSION: &str = "\
format
create alpha
create beta
write alpha first file
writeln beta
line one
line two
.
read alpha
read beta
rm alpha
ls
quit
";

fn check_session(model: DiskModel) {
    let image = temp_image();
    let (rc, text) = boot_with(&config(model, &image), SESSION);
    assert_eq!(rc, 0);

    assert!(text.starts_with("Kernel: Disk is 12 blocks\nKernel: Disk cache size is 10 blocks\n"));
    assert!(text.contains("Kernel: Disk formatted.\n"));
    assert!(text.contains("Kernel: Created file alpha at block 1.\n"));
    assert!(text.contains("Kernel: Created file beta at block 2.\n"));
    assert!(text.contains("first file\n"));
    assert!(text.contains("line one\\n\nline two\\n\n"));
    assert!(text.contains("--> beta\n"));
    assert!(!text.contains("***"));
    assert!(text.ends_with("Kernel: FileTester has terminated.\n"));

    let size = std::fs::metadata(&image).unwrap().len();
    assert_eq!(size, 12 * 512);
    std::fs::remove_file(image).unwrap();
}

#[test]
fn file_tester_on_the_fast_disk() {
    check_session(DiskModel::FastDisk);
}

#[test]
fn file_tester_on_the_slow_disk() {
    check_session(DiskModel::Disk);
}

#[test]
fn files_survive_a_reboot() {
    let image = temp_image();
    let (rc, _) = boot_with(
        &config(DiskModel::Disk, &image),
        "format\ncreate keep\nwrite keep across boots\nquit\n",
    );
    assert_eq!(rc, 0);

    let (rc, text) = boot_with(&config(DiskModel::FastDisk, &image), "ls\nread keep\n");
    assert_eq!(rc, 0);
    assert!(text.contains("--> keep\n"));
    assert!(text.contains("across boots\n"));

    std::fs::remove_file(image).unwrap();
}

#[test]
fn a_missing_shell_stops_the_boot() {
    let image = temp_image();
    let mut boot = config(DiskModel::FastDisk, &image);
    boot.shell = vec!["NoSuchShell".into()];
    let (rc, text) = boot_with(&boot, "");
    assert_eq!(rc, ErrorCode::NoClass.code());
    assert!(text.contains("Kernel: Unable to start NoSuchShell!\n"));
    let _ = std::fs::remove_file(image);
}

const WORKERS: usize = 6;

/// Creates, writes and reads back its own file. Returns 1 on a mismatch.
fn worker(lib: &Library, args: &[String]) -> i32 {
    let name = &args[0];
    let data = format!("contents of {name}");
    for rc in [lib.create(name), lib.write(name, data.as_bytes())] {
        if rc < 0 {
            return rc;
        }
    }
    let mut buf = vec![0; lib.block_size() as usize];
    let n = lib.read(name, &mut buf);
    if n < 0 {
        return n;
    }
    let (head, tail) = buf[..n as usize].split_at(data.len());
    if head != data.as_bytes() || tail.iter().any(|&b| b != 0) {
        return 1;
    }
    0
}

/// Formats the disk, starts every worker at once, then joins them.
fn spawner(lib: &Library, _args: &[String]) -> i32 {
    if lib.format() != 0 {
        return -1;
    }
    let pids: Vec<i32> = (0..WORKERS)
        .map(|i| lib.exec("Worker", [format!("file{i}")]))
        .collect();
    if pids.iter().any(|&pid| pid < 0) {
        return -1;
    }
    let failed = pids.into_iter().filter(|&pid| lib.join(pid) != 0).count();
    let mut names = Vec::new();
    if lib.readdir(&mut names) != 0 || names.len() != WORKERS {
        return -1;
    }
    failed as i32
}

#[test]
fn concurrent_processes_share_the_slow_disk() {
    let image = temp_image();
    let mut programs = ProgramRegistry::new();
    programs.register("Worker", worker).register("Spawner", spawner);
    let mut boot = config(DiskModel::Disk, &image);
    boot.shell = vec!["Spawner".into()];

    let (rc, text) = boot_programs(&boot, programs, "");
    assert_eq!(rc, 0, "{text}");
    for i in 0..WORKERS {
        assert!(text.contains(&format!("Kernel: Created file file{i} at block ")));
    }
    assert!(!text.contains("User error"));
    assert!(text.ends_with("Kernel: Spawner has terminated.\n"));

    std::fs::remove_file(image).unwrap();
}
