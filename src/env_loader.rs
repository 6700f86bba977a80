use std::env;
use std::path::PathBuf;

fn fallback_dotenv_paths(vmtidy_home: Option<PathBuf>, config_dir: Option<PathBuf>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(home) = vmtidy_home {
        out.push(home.join(".env"));
    }
    if let Some(dir) = config_dir {
        out.push(dir.join("vmtidy").join(".env"));
    }
    out
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallbacks = fallback_dotenv_paths(
        env::var_os("VMTIDY_HOME").map(PathBuf::from),
        dirs::config_dir(),
    );

    if let Some(path) = fallbacks.into_iter().find(|p| p.is_file()) {
        let _ = dotenvy::from_path(&path);
    }
}
