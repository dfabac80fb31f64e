use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array1;
use sci_spectral::kernel::KernelLifecycle;
use sci_spectral::num_complex::Complex;
use sci_spectral::signal::detrend::{detrend_dyn, Detrend, DetrendConfig, DetrendKernel, DetrendType};
use sci_spectral::signal::spectral::{
    coherence_dyn, csd_dyn, periodogram_dyn, stft_dyn, welch_dyn, Average, CoherenceKernel,
    CsdKernel, PeriodogramKernel, PeriodogramParams, Scaling, SpectralParams, SpectralWindow,
    StftParams, WelchKernel,
};
use sci_spectral::signal::traits::{
    Coherence1D, Csd1D, Detrend1D, Periodogram1D, WelchPsd1D, WindowGenerate,
};
use sci_spectral::signal::windows::{GetWindow, WindowBuilderOwned, WindowConfig, WindowKernel};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const DEFAULT_PYTHON_BIN: &str = "python";

const PY_SPECTRAL_SCRIPT: &str = r#"
import json
import sys
import time
import numpy as np
import scipy.signal

env = json.loads(sys.stdin.read())
op = env["op"]
iters = int(env["iters"])
p = env["payload"]

def _arr(key):
    return np.asarray(p[key], dtype=float)

def _window():
    w = p.get("window", "hann")
    if isinstance(w, list) and w and isinstance(w[0], str):
        return tuple(w)
    if isinstance(w, list):
        return np.asarray(w, dtype=float)
    return w

def _detrend():
    d = p.get("detrend", "constant")
    return False if d is None else d

def _cplx(v):
    v = np.asarray(v).reshape(-1)
    return np.stack([v.real, v.imag], axis=-1).reshape(-1)

def _welch_kwargs():
    return dict(
        fs=float(p.get("fs", 1.0)),
        window=_window(),
        nperseg=p.get("nperseg"),
        noverlap=p.get("noverlap"),
        nfft=p.get("nfft"),
        detrend=_detrend(),
        scaling=p.get("scaling", "density"),
    )

def _compute():
    if op == "welch":
        f, pxx = scipy.signal.welch(_arr("x"), average=p.get("average", "mean"), **_welch_kwargs())
        return np.concatenate([f, pxx])
    if op == "csd":
        f, pxy = scipy.signal.csd(_arr("x"), _arr("y"), average=p.get("average", "mean"), **_welch_kwargs())
        return np.concatenate([f, _cplx(pxy)])
    if op == "coherence":
        kw = _welch_kwargs()
        kw.pop("scaling")
        f, cxy = scipy.signal.coherence(_arr("x"), _arr("y"), **kw)
        return np.concatenate([f, cxy])
    if op == "periodogram":
        f, pxx = scipy.signal.periodogram(
            _arr("x"),
            fs=float(p.get("fs", 1.0)),
            window=_window(),
            nfft=p.get("nfft"),
            detrend=_detrend(),
            scaling=p.get("scaling", "density"),
        )
        return np.concatenate([f, pxx])
    if op == "stft":
        f, t, zxx = scipy.signal.stft(
            _arr("x"),
            fs=float(p.get("fs", 1.0)),
            window=_window(),
            nperseg=int(p["nperseg"]),
            noverlap=p.get("noverlap"),
        )
        return np.concatenate([f, t, _cplx(zxx)])
    if op == "detrend":
        return scipy.signal.detrend(_arr("x"), type=p["type"], bp=p.get("bp", 0))
    if op == "get_window":
        return scipy.signal.get_window(_window(), int(p["nx"]), fftbins=bool(p["fftbins"]))

    raise RuntimeError(f"unsupported op: {op}")

y = np.asarray(_compute(), dtype=float).reshape(-1)

t0 = time.perf_counter_ns()
for _ in range(iters):
    _compute()
t1 = time.perf_counter_ns()

print(json.dumps({
    "output": y.tolist(),
    "avg_ns": (t1 - t0) / max(iters, 1),
    "python_version": sys.version.split()[0],
    "numpy_version": np.__version__,
    "scipy_version": scipy.__version__,
}))
"#;

const PY_PLOT_SCRIPT: &str = r#"
import json
import sys
import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
from matplotlib.backends.backend_pdf import PdfPages

payload = json.loads(sys.stdin.read())

with PdfPages(payload["report_pdf"]) as pdf:
    for case in payload["cases"]:
        rust = case["rust"]
        py = case["python"]
        x = list(range(len(py)))
        fig, (top, bottom) = plt.subplots(2, 1, figsize=(10, 6), sharex=True)
        top.semilogy(x, [abs(v) + 1e-300 for v in py], label="SciPy", linewidth=1.6)
        top.semilogy(x, [abs(v) + 1e-300 for v in rust], label="Rust", linewidth=1.0, alpha=0.8)
        top.set_title(case["case_id"])
        top.legend()
        bottom.plot(x, [r - q for r, q in zip(rust, py)], color="tab:red", linewidth=1.0)
        bottom.set_xlabel("flattened index")
        bottom.set_ylabel("Rust - SciPy")
        fig.tight_layout()
        fig.savefig(case["plot"], dpi=150)
        pdf.savefig(fig)
        plt.close(fig)
"#;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct PythonEval {
    output: Vec<f64>,
    avg_ns: f64,
    python_version: String,
    numpy_version: String,
    scipy_version: String,
}

/// Agreement of one Rust estimate with its SciPy reference.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct ContractRow {
    case_id: String,
    len: usize,
    max_abs: f64,
    max_rel: f64,
    rmse: f64,
    kernel_ns: f64,
    dyn_ns: f64,
    python_ns: f64,
    speedup_vs_python: f64,
    plot: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContractBundle {
    generated_epoch_seconds: u64,
    python_executable: String,
    python_version: String,
    numpy_version: String,
    scipy_version: String,
    tolerance: f64,
    failures: Vec<String>,
    rows: Vec<ContractRow>,
}

/// Largest relative deviation from SciPy accepted by `contracts`.
const REL_TOLERANCE: f64 = 1e-8;

/// One contract: a kernel run, the equivalent `*_dyn` run and the SciPy
/// call they must both reproduce.
struct Case<'a> {
    id: &'a str,
    op: &'a str,
    payload: serde_json::Value,
    kernel: Box<dyn Fn() -> Result<Vec<f64>> + 'a>,
    dyn_api: Box<dyn Fn() -> Result<Vec<f64>> + 'a>,
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("contracts") => run_contracts(),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- contracts");
            Ok(())
        }
    }
}

fn test_signal(n: usize, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / 100.0;
            (2.0 * std::f64::consts::PI * 12.5 * t + phase).sin()
                + 0.4 * (2.0 * std::f64::consts::PI * 31.0 * t).cos()
                + 0.05 * t
                + 0.2 * ((i * 7919 % 101) as f64 / 101.0 - 0.5)
        })
        .collect()
}

fn chain(freqs: Vec<f64>, values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    freqs.into_iter().chain(values).collect()
}

fn interleave(values: impl IntoIterator<Item = Complex<f64>>) -> impl Iterator<Item = f64> {
    values.into_iter().flat_map(|c| [c.re, c.im])
}

fn run_err(op: &str) -> impl Fn(sci_spectral::kernel::ExecInvariantViolation) -> anyhow::Error + '_ {
    move |e| anyhow!("{op} kernel execution failed: {e}")
}

fn build_cases<'a>(x: &'a [f64], y: &'a [f64]) -> Result<Vec<Case<'a>>> {
    let xa = Array1::from(x.to_vec());
    let ya = Array1::from(y.to_vec());
    let mut cases = Vec::new();

    // Welch, Hann, density.
    let params = SpectralParams {
        fs: 100.0,
        nperseg: Some(64),
        ..Default::default()
    };
    let kernel = WelchKernel::try_new(params.clone())?;
    cases.push(Case {
        id: "welch_hann_density",
        op: "welch",
        payload: json!({ "x": x, "fs": 100.0, "nperseg": 64 }),
        kernel: Box::new(move || {
            let (f, pxx) = kernel.run_alloc(x).map_err(run_err("welch"))?;
            Ok(chain(f, pxx))
        }),
        dyn_api: {
            let xa = xa.clone();
            Box::new(move || {
                let out = welch_dyn(&xa, &params)?;
                Ok(chain(out.frequencies.to_vec(), out.pxx.iter().copied()))
            })
        },
    });

    // Welch, Hamming, median, spectrum scaling, heavy overlap.
    let params = SpectralParams {
        fs: 100.0,
        window: SpectralWindow::Builder(WindowBuilderOwned::Hamming),
        nperseg: Some(128),
        noverlap: Some(96),
        scaling: Scaling::Spectrum,
        average: Average::Median,
        ..Default::default()
    };
    let kernel = WelchKernel::try_new(params.clone())?;
    cases.push(Case {
        id: "welch_hamming_median_spectrum",
        op: "welch",
        payload: json!({
            "x": x, "fs": 100.0, "window": "hamming", "nperseg": 128, "noverlap": 96,
            "scaling": "spectrum", "average": "median"
        }),
        kernel: Box::new(move || {
            let (f, pxx) = kernel.run_alloc(x).map_err(run_err("welch"))?;
            Ok(chain(f, pxx))
        }),
        dyn_api: {
            let xa = xa.clone();
            Box::new(move || {
                let out = welch_dyn(&xa, &params)?;
                Ok(chain(out.frequencies.to_vec(), out.pxx.iter().copied()))
            })
        },
    });

    // Welch, linear detrend, zero-padded FFT, odd segment length.
    let params = SpectralParams {
        fs: 100.0,
        nperseg: Some(99),
        nfft: Some(128),
        detrend: Detrend::Linear,
        ..Default::default()
    };
    let kernel = WelchKernel::try_new(params.clone())?;
    cases.push(Case {
        id: "welch_linear_detrend_nfft",
        op: "welch",
        payload: json!({ "x": x, "fs": 100.0, "nperseg": 99, "nfft": 128, "detrend": "linear" }),
        kernel: Box::new(move || {
            let (f, pxx) = kernel.run_alloc(x).map_err(run_err("welch"))?;
            Ok(chain(f, pxx))
        }),
        dyn_api: {
            let xa = xa.clone();
            Box::new(move || {
                let out = welch_dyn(&xa, &params)?;
                Ok(chain(out.frequencies.to_vec(), out.pxx.iter().copied()))
            })
        },
    });

    // CSD of signals of different lengths.
    let y_short = &y[..400];
    let params = SpectralParams {
        fs: 100.0,
        nperseg: Some(64),
        window: SpectralWindow::Builder(WindowBuilderOwned::GeneralHamming { coefficient: 0.6 }),
        ..Default::default()
    };
    let kernel = CsdKernel::try_new(params.clone())?;
    cases.push(Case {
        id: "csd_general_hamming_padded",
        op: "csd",
        payload: json!({
            "x": x, "y": y_short, "fs": 100.0, "nperseg": 64, "window": ["general_hamming", 0.6]
        }),
        kernel: Box::new(move || {
            let (f, pxy) = kernel.run_alloc(x, y_short).map_err(run_err("csd"))?;
            Ok(chain(f, interleave(pxy)))
        }),
        dyn_api: {
            let xa = xa.clone();
            let ys = Array1::from(y_short.to_vec());
            Box::new(move || {
                let out = csd_dyn(&xa, &ys, &params)?;
                Ok(chain(out.frequencies.to_vec(), interleave(out.pxy.iter().copied())))
            })
        },
    });

    // Coherence.
    let params = SpectralParams {
        fs: 100.0,
        nperseg: Some(128),
        ..Default::default()
    };
    let kernel = CoherenceKernel::try_new(params.clone())?;
    cases.push(Case {
        id: "coherence_hann",
        op: "coherence",
        payload: json!({ "x": x, "y": y, "fs": 100.0, "nperseg": 128 }),
        kernel: Box::new(move || {
            let (f, cxy) = kernel.run_alloc(x, y).map_err(run_err("coherence"))?;
            Ok(chain(f, cxy))
        }),
        dyn_api: {
            let (xa, ya) = (xa.clone(), ya.clone());
            Box::new(move || {
                let out = coherence_dyn(&xa, &ya, &params)?;
                Ok(chain(out.frequencies.to_vec(), out.cxy.iter().copied()))
            })
        },
    });

    // Periodogram truncated by nfft.
    let params = PeriodogramParams {
        fs: 100.0,
        nfft: Some(400),
        ..Default::default()
    };
    let kernel = PeriodogramKernel::try_new(params.clone())?;
    cases.push(Case {
        id: "periodogram_boxcar_truncated",
        op: "periodogram",
        payload: json!({ "x": x, "fs": 100.0, "window": "boxcar", "nfft": 400 }),
        kernel: Box::new(move || {
            let (f, pxx) = kernel.run_alloc(x).map_err(run_err("periodogram"))?;
            Ok(chain(f, pxx))
        }),
        dyn_api: {
            let xa = xa.clone();
            Box::new(move || {
                let out = periodogram_dyn(&xa, &params)?;
                Ok(chain(out.frequencies.to_vec(), out.pxx.iter().copied()))
            })
        },
    });

    // STFT: no 1D kernel, both sides run the n-d API.
    let params = StftParams {
        fs: 100.0,
        nperseg: 64,
        ..Default::default()
    };
    let stft_flat = {
        let xa = xa.clone();
        move || -> Result<Vec<f64>> {
            let out = stft_dyn(&xa, &params)?;
            Ok(out
                .frequencies
                .iter()
                .chain(out.times.iter())
                .copied()
                .chain(interleave(out.zxx.iter().copied()))
                .collect())
        }
    };
    cases.push(Case {
        id: "stft_hann_zeros_padded",
        op: "stft",
        payload: json!({ "x": x, "fs": 100.0, "nperseg": 64 }),
        kernel: Box::new(stft_flat.clone()),
        dyn_api: Box::new(stft_flat),
    });

    // Piecewise linear detrend.
    let kernel = DetrendKernel::try_new(DetrendConfig {
        kind: DetrendType::Linear,
        bp: vec![100, 300],
    })?;
    cases.push(Case {
        id: "detrend_linear_breakpoints",
        op: "detrend",
        payload: json!({ "x": x, "type": "linear", "bp": [100, 300] }),
        kernel: Box::new(move || kernel.run_alloc(x).map_err(run_err("detrend"))),
        dyn_api: {
            let xa = xa.clone();
            Box::new(move || {
                Ok(detrend_dyn(&xa, None, DetrendType::Linear, &[100, 300])?.to_vec())
            })
        },
    });

    // Periodic general cosine window.
    let kernel = WindowKernel::try_new(WindowConfig {
        builder: WindowBuilderOwned::GeneralCosine {
            weights: vec![0.42, 0.5, 0.08],
        },
        nx: 64,
        fftbins: Some(true),
    })?;
    cases.push(Case {
        id: "get_window_general_cosine",
        op: "get_window",
        payload: json!({ "window": ["general_cosine", [0.42, 0.5, 0.08]], "nx": 64, "fftbins": true }),
        kernel: Box::new(move || kernel.run_alloc().map_err(run_err("window"))),
        dyn_api: Box::new(|| {
            Ok(WindowBuilderOwned::GeneralCosine {
                weights: vec![0.42, 0.5, 0.08],
            }
            .build_window(64, Some(true))
            .get_window())
        }),
    });

    Ok(cases)
}

fn run_contracts() -> Result<()> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/contracts/{ts}"));
    let plots_dir = out_dir.join("plots");
    fs::create_dir_all(&plots_dir).context("creating contract output directories")?;

    let python_bin = PathBuf::from(DEFAULT_PYTHON_BIN);
    let x = test_signal(1000, 0.0);
    let y = test_signal(1000, 0.7);

    let mut rows = Vec::new();
    let mut plots = Vec::new();
    let mut failures = Vec::new();
    let mut versions = None;

    for case in build_cases(&x, &y)? {
        let candidate = (case.kernel)()?;
        let via_dyn = (case.dyn_api)()?;
        if candidate != via_dyn {
            failures.push(format!("{}: kernel and n-d API disagree", case.id));
        }
        let py = python_eval(&python_bin, case.op, case.payload, 50)
            .with_context(|| format!("evaluating SciPy reference for {}", case.id))?;
        if candidate.len() != py.output.len() {
            bail!(
                "case {} has mismatched output lengths: rust={}, scipy={}",
                case.id,
                candidate.len(),
                py.output.len()
            );
        }

        let kernel_ns = time_avg_ns(50, case.kernel.as_ref())?;
        let dyn_ns = time_avg_ns(50, case.dyn_api.as_ref())?;
        let residuals = Residuals::between(&candidate, &py.output);
        if residuals.max_rel > REL_TOLERANCE {
            failures.push(format!(
                "{}: max relative deviation {:.3e} exceeds {REL_TOLERANCE:.0e}",
                case.id, residuals.max_rel
            ));
        }

        let plot = plots_dir.join(format!("{}.png", case.id));
        plots.push(json!({
            "case_id": case.id,
            "rust": &candidate,
            "python": &py.output,
            "plot": plot.to_string_lossy(),
        }));
        rows.push(ContractRow {
            case_id: case.id.to_string(),
            len: candidate.len(),
            max_abs: residuals.max_abs,
            max_rel: residuals.max_rel,
            rmse: residuals.rmse,
            kernel_ns,
            dyn_ns,
            python_ns: py.avg_ns,
            speedup_vs_python: py.avg_ns / kernel_ns,
            plot: plot.to_string_lossy().into_owned(),
        });
        versions.get_or_insert(py);
    }

    let versions = versions.ok_or_else(|| anyhow!("no contract cases were run"))?;
    let report_pdf = out_dir.join("report.pdf");
    run_python(
        &python_bin,
        PY_PLOT_SCRIPT,
        &json!({ "cases": plots, "report_pdf": report_pdf.to_string_lossy() }),
    )
    .context("rendering contract plots")?;

    let bundle = ContractBundle {
        generated_epoch_seconds: ts,
        python_executable: python_bin.to_string_lossy().into_owned(),
        python_version: versions.python_version,
        numpy_version: versions.numpy_version,
        scipy_version: versions.scipy_version,
        tolerance: REL_TOLERANCE,
        failures,
        rows,
    };
    write_summary_csv(&out_dir.join("summary.csv"), &bundle.rows)?;
    fs::write(
        out_dir.join("summary.json"),
        serde_json::to_vec_pretty(&bundle).context("serializing summary bundle")?,
    )
    .context("writing summary.json")?;

    println!("Contract artifacts generated in: {}", out_dir.display());
    println!("  - {}", report_pdf.display());
    println!("  - cases: {}", bundle.rows.len());
    if !bundle.failures.is_empty() {
        bundle.failures.iter().for_each(|f| eprintln!("  ! {f}"));
        bail!("{} contract(s) failed", bundle.failures.len());
    }
    Ok(())
}

fn python_eval(
    python_bin: &Path,
    op: &str,
    payload: serde_json::Value,
    iters: usize,
) -> Result<PythonEval> {
    let stdout = run_python(
        python_bin,
        PY_SPECTRAL_SCRIPT,
        &json!({ "op": op, "iters": iters, "payload": payload }),
    )?;
    serde_json::from_str(stdout.trim()).context("parsing python json")
}

/// Run `script` with `payload` as JSON on stdin and return its stdout.
fn run_python(python_bin: &Path, script: &str, payload: &serde_json::Value) -> Result<String> {
    let mut child = Command::new(python_bin)
        .arg("-c")
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning python interpreter at {}", python_bin.display()))?;

    {
        let stdin = child.stdin.as_mut().context("opening python stdin")?;
        let bytes = serde_json::to_vec(payload).context("serializing python payload")?;
        stdin
            .write_all(&bytes)
            .context("writing payload to python stdin")?;
    }

    let output = child
        .wait_with_output()
        .context("waiting for python process")?;
    if !output.status.success() {
        bail!(
            "python execution failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8(output.stdout).context("parsing python stdout utf8")
}

fn time_avg_ns(iters: usize, f: &dyn Fn() -> Result<Vec<f64>>) -> Result<f64> {
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_nanos() as f64 / iters as f64)
}

struct Residuals {
    max_abs: f64,
    max_rel: f64,
    rmse: f64,
}

impl Residuals {
    /// Relative error is taken against the largest reference magnitude, so
    /// bins that should be zero do not dominate.
    fn between(rust: &[f64], reference: &[f64]) -> Self {
        let scale = reference
            .iter()
            .fold(f64::MIN_POSITIVE, |acc, v| acc.max(v.abs()));
        let (max_abs, sum_sq) = rust
            .iter()
            .zip(reference)
            .map(|(r, p)| (r - p).abs())
            .fold((0.0f64, 0.0f64), |(max, sq), d| (max.max(d), sq + d * d));
        Residuals {
            max_abs,
            max_rel: max_abs / scale,
            rmse: (sum_sq / rust.len().max(1) as f64).sqrt(),
        }
    }
}

fn write_summary_csv(path: &Path, rows: &[ContractRow]) -> Result<()> {
    let mut out = String::from(
        "case_id,len,max_abs,max_rel,rmse,kernel_ns,dyn_ns,python_ns,speedup_vs_python,plot\n",
    );
    for row in rows {
        out.push_str(&format!(
            "{},{},{:.6e},{:.6e},{:.6e},{:.1},{:.1},{:.1},{:.3},{}\n",
            row.case_id,
            row.len,
            row.max_abs,
            row.max_rel,
            row.rmse,
            row.kernel_ns,
            row.dyn_ns,
            row.python_ns,
            row.speedup_vs_python,
            row.plot
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
