//! systemd unit generation for running the listener as a service.
use std::env;
use std::path::{Path, PathBuf};

pub const SERVICE_NAME: &str = "air780e-listener.service";

/// Values substituted into the unit template.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub user: String,
    pub working_dir: PathBuf,
    pub executable: PathBuf,
    pub config_path: PathBuf,
}

impl ServiceSpec {
    /// Describe the current process: invoking user, working directory and
    /// executable. `config_path` is made absolute against the working directory.
    pub fn from_env(config_path: &Path) -> std::io::Result<Self> {
        let working_dir = env::current_dir()?;
        let executable = env::current_exe()?;
        let user = env::var("USER")
            .or_else(|_| env::var("LOGNAME"))
            .unwrap_or_else(|_| "root".to_string());
        let config_path = if config_path.is_absolute() {
            config_path.to_path_buf()
        } else {
            working_dir.join(config_path)
        };
        Ok(Self {
            user,
            working_dir,
            executable,
            config_path,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "[Unit]\n\
             Description=AIR780E SMS listener\n\
             After=network.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             User={user}\n\
             WorkingDirectory={wd}\n\
             ExecStart={exe} --config {cfg} listen\n\
             Restart=always\n\
             RestartSec=5\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n",
            user = self.user,
            wd = self.working_dir.display(),
            exe = self.executable.display(),
            cfg = self.config_path.display(),
        )
    }
}
