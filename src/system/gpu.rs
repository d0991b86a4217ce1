use std::process::Command;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuInfo {
    pub name: String,
    pub driver: String,
}

impl Default for GpuInfo {
    fn default() -> Self {
        GpuInfo {
            name: "Unknown".to_string(),
            driver: "Unknown".to_string(),
        }
    }
}

/// Best-effort GPU name and driver, probed once at startup.
///
/// Tries nvidia-smi, the NVIDIA proc driver file, glxinfo and lspci in that
/// order; any tool that is missing or fails is skipped.
pub fn detect_gpu_info() -> GpuInfo {
    if let Some(out) = run(
        "nvidia-smi",
        &["--query-gpu=name,driver_version", "--format=csv,noheader"],
    ) && let Some(info) = parse_nvidia_smi(&out)
    {
        return info;
    }

    if let Ok(text) = std::fs::read_to_string("/proc/driver/nvidia/version")
        && let Some(info) = parse_nvidia_proc_version(&text)
    {
        return info;
    }

    if let Some(out) = run("glxinfo", &[])
        && let Some(info) = parse_glxinfo(&out)
    {
        return info;
    }

    if let Some(out) = run("lspci", &["-nnk"])
        && let Some(info) = parse_lspci(&out)
    {
        return info;
    }

    GpuInfo::default()
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_nvidia_smi(out: &str) -> Option<GpuInfo> {
    let line = out.lines().map(str::trim).find(|l| !l.is_empty())?;
    let mut parts = line.split(',').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty()).unwrap_or("NVIDIA GPU");
    let driver = parts.next().filter(|d| !d.is_empty()).unwrap_or("Unknown");
    Some(GpuInfo {
        name: name.to_string(),
        driver: driver.to_string(),
    })
}

fn parse_nvidia_proc_version(text: &str) -> Option<GpuInfo> {
    let first = text.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    let version = first
        .split_whitespace()
        .find(|tok| is_version_token(tok))
        .unwrap_or(first);
    Some(GpuInfo {
        name: "NVIDIA GPU".to_string(),
        driver: version.to_string(),
    })
}

fn is_version_token(tok: &str) -> bool {
    tok.contains('.')
        && tok.split('.').count() >= 2
        && tok.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

fn parse_glxinfo(out: &str) -> Option<GpuInfo> {
    let value = |key: &str| {
        out.lines()
            .find(|l| l.contains(key))
            .and_then(|l| l.split_once(':'))
            .map(|(_, v)| v.trim().to_string())
    };
    let renderer = value("OpenGL renderer string").filter(|r| !r.is_empty())?;
    let driver = value("OpenGL version string").unwrap_or_else(|| "Unknown".to_string());
    Some(GpuInfo {
        name: renderer,
        driver,
    })
}

fn parse_lspci(out: &str) -> Option<GpuInfo> {
    let lines: Vec<&str> = out.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if !(lower.contains("vga compatible controller")
            || lower.contains("3d controller")
            || lower.contains("display controller"))
        {
            continue;
        }
        let name = line
            .split_once(':')
            .map(|(_, rest)| rest)
            .and_then(|rest| rest.split_once(':').map(|(_, dev)| dev).or(Some(rest)))
            .unwrap_or(line)
            .trim()
            .to_string();
        let driver = lines
            .iter()
            .skip(i + 1)
            .take(5)
            .find_map(|l| {
                l.to_lowercase()
                    .contains("kernel driver in use:")
                    .then(|| l.split_once(':').map(|(_, d)| d.trim().to_string()))
                    .flatten()
            })
            .unwrap_or_else(|| "Unknown".to_string());
        return Some(GpuInfo { name, driver });
    }
    None
}
