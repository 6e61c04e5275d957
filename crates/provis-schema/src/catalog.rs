//! The built-in item types: Distro, Image, Profile, System and Repo.
//!
//! Choice lists and site defaults come from [`CatalogSettings`] so that
//! deployments can extend them without redeclaring the schemas.

use provis_types::Value;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::field::FieldSpec;
use crate::registry::Registry;
use crate::requirement::require_one_of;
use crate::schema::{Schema, SchemaBuilder};

pub const DISTRO: &str = "Distro";
pub const IMAGE: &str = "Image";
pub const PROFILE: &str = "Profile";
pub const SYSTEM: &str = "System";
pub const REPO: &str = "Repo";

/// Site-specific choice lists and defaults for the built-in types.
///
/// The first entry of each choice list is the field's default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub architectures: Vec<String>,
    pub breeds: Vec<String>,
    pub os_versions: Vec<String>,
    pub image_os_versions: Vec<String>,
    pub power_types: Vec<String>,
    pub default_virt_bridge: String,
    pub default_name_servers: Vec<String>,
    pub default_name_servers_search: Vec<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            architectures: strings(&["i386", "x86_64", "ia64", "ppc", "s390"]),
            breeds: strings(&["redhat", "debian"]),
            os_versions: strings(&[
                "generic26", "rhel4", "rhel5", "rhel6", "fedora", "debian5", "ubuntu",
            ]),
            image_os_versions: strings(&["rhel4", "rhel5", "rhel6", "fedora", "generic26"]),
            power_types: strings(&[
                "ipmilan",
                "ipmitool",
                "apc_snmp",
                "bladecenter",
                "drac",
                "ether_wake",
                "ilo",
                "lpar",
                "rsa",
                "virsh",
                "wti",
            ]),
            default_virt_bridge: "xenbr0".to_string(),
            default_name_servers: Vec::new(),
            default_name_servers_search: Vec::new(),
        }
    }
}

fn first(choices: &[String]) -> String {
    choices.first().cloned().unwrap_or_default()
}

fn string_list(items: &[String]) -> Value {
    Value::List(items.iter().cloned().map(Value::Str).collect())
}

fn architecture(settings: &CatalogSettings) -> FieldSpec {
    FieldSpec::choice("architecture", settings.architectures.clone())
        .default(first(&settings.architectures))
}

fn breed(settings: &CatalogSettings) -> FieldSpec {
    FieldSpec::choice("breed", settings.breeds.clone())
        .default(first(&settings.breeds))
        .comment("What is the type of distribution?")
}

fn mgmt_classes() -> FieldSpec {
    FieldSpec::list("mgmt_classes")
        .display_name("Management Classes")
        .comment("For external config management")
}

fn mgmt_parameters() -> FieldSpec {
    FieldSpec::map("mgmt_parameters")
        .inherit()
        .display_name("Management Parameters")
        .comment("Parameters which will be handed to your management application")
}

fn template_files() -> FieldSpec {
    FieldSpec::map("template_files")
        .comment("File mappings for built-in configuration management")
}

fn red_hat_management() -> [FieldSpec; 2] {
    [
        FieldSpec::str("red_hat_management_key")
            .inherit()
            .comment("Registration key for RHN, Satellite, or Spacewalk"),
        FieldSpec::str("red_hat_management_server")
            .inherit()
            .comment("Address of Satellite or Spacewalk Server"),
    ]
}

fn kernel_options_post() -> FieldSpec {
    FieldSpec::map("kernel_options_post").display_name("Kernel Options (Post Install)")
}

/// Virtualization fields that profiles and systems inherit.
fn inherited_virt() -> [FieldSpec; 6] {
    [
        FieldSpec::str("virt_path")
            .inherit()
            .comment("Ex: /directory or VolGroup00"),
        FieldSpec::str("virt_type")
            .inherit()
            .comment("Virtualization technology to use"),
        FieldSpec::int("virt_cpus").inherit(),
        FieldSpec::float("virt_file_size").inherit().comment("(GB)"),
        FieldSpec::int("virt_ram")
            .inherit()
            .display_name("Virt RAM")
            .comment("(MB)"),
        FieldSpec::bool("virt_auto_boot")
            .inherit()
            .comment("Auto boot this VM?"),
    ]
}

pub fn distro(settings: &CatalogSettings) -> Result<Schema> {
    SchemaBuilder::new(DISTRO)
        .field(FieldSpec::str("name").required())
        .field(FieldSpec::list("owners"))
        .field(FieldSpec::item_ref("distro", DISTRO).comment("Parent distribution"))
        .field(
            FieldSpec::local_file("kernel")
                .required()
                .comment("Absolute path to kernel on filesystem"),
        )
        .field(
            FieldSpec::local_file("initrd")
                .required()
                .comment("Absolute path to initrd on filesystem"),
        )
        .field(FieldSpec::map("kernel_options"))
        .field(kernel_options_post())
        .field(architecture(settings))
        .field(breed(settings))
        .field(
            FieldSpec::choice("os_version", settings.os_versions.clone())
                .default(first(&settings.os_versions))
                .display_name("OS Version")
                .comment("Needed for some virtualization optimizations"),
        )
        .field(FieldSpec::list("source_repos"))
        .field(FieldSpec::int("depth"))
        .field(FieldSpec::str("comment").comment("Free form text description"))
        .field(FieldSpec::str("tree_build_time"))
        .field(FieldSpec::map("kickstart_metadata"))
        .field(mgmt_classes())
        .field(mgmt_parameters())
        .field(template_files())
        .fields(red_hat_management())
        .field(FieldSpec::bool("template_remote_kickstarts"))
        .parents(["distro"])
        .build()
}

pub fn image(settings: &CatalogSettings) -> Result<Schema> {
    SchemaBuilder::new(IMAGE)
        .field(FieldSpec::str("name").required())
        .field(FieldSpec::list("owners"))
        .field(architecture(settings))
        .field(breed(settings))
        .field(FieldSpec::str("comment").comment("Free form text description"))
        .field(FieldSpec::local_file("file").comment("Path to local file or nfs://user@host:path"))
        .field(FieldSpec::int("depth"))
        .field(
            FieldSpec::choice("image_type", ["iso", "direct", "virt-image"]).default("iso"),
        )
        .field(
            FieldSpec::int("network_count")
                .default(1)
                .display_name("Virt NICs"),
        )
        .field(
            FieldSpec::choice("os_version", settings.image_os_versions.clone())
                .default(first(&settings.image_os_versions))
                .display_name("OS Version")
                .comment("ex: rhel4"),
        )
        .field(FieldSpec::local_file("kickstart").comment("Path to kickstart/answer file template"))
        .field(
            FieldSpec::bool("virt_auto_boot")
                .default(false)
                .comment("Auto boot this VM?"),
        )
        .field(FieldSpec::str("virt_bridge").default(settings.default_virt_bridge.clone()))
        .field(
            FieldSpec::str("virt_path")
                .inherit()
                .comment("Ex: /directory or VolGroup00"),
        )
        .field(
            FieldSpec::str("virt_type")
                .inherit()
                .comment("Virtualization technology to use"),
        )
        .field(FieldSpec::int("virt_cpus").default(1))
        .field(FieldSpec::float("virt_file_size").default(1.0).comment("(GB)"))
        .field(
            FieldSpec::int("virt_ram")
                .default(200)
                .display_name("Virt RAM")
                .comment("(MB)"),
        )
        .build()
}

pub fn profile(settings: &CatalogSettings) -> Result<Schema> {
    SchemaBuilder::new(PROFILE)
        .field(FieldSpec::str("name").required())
        .field(FieldSpec::list("owners"))
        .field(FieldSpec::item_ref("profile", PROFILE).comment("Parent profile"))
        .field(FieldSpec::item_ref("distro", DISTRO).required().inherit())
        .field(
            FieldSpec::bool("enable_menu")
                .inherit()
                .display_name("Enable PXE Menu?")
                .comment("Show this profile in PXE menu?"),
        )
        .field(
            FieldSpec::map("kernel_options")
                .inherit()
                .comment("Ex: selinux=permissive"),
        )
        .field(kernel_options_post().inherit())
        .field(
            FieldSpec::map("kickstart_metadata")
                .inherit()
                .comment("Ex: dog=fang agent=86"),
        )
        .field(FieldSpec::local_file("kickstart").inherit())
        .field(FieldSpec::bool("netboot_enabled"))
        .field(FieldSpec::str("comment").tag("TextField"))
        .field(FieldSpec::int("depth").default(1))
        .field(
            FieldSpec::str("server_override")
                .inherit()
                .comment("See manpage or leave blank"),
        )
        .fields(inherited_virt())
        .field(
            FieldSpec::str("virt_bridge")
                .inherit()
                .default(settings.default_virt_bridge.clone()),
        )
        .field(
            FieldSpec::list("repos")
                .inherit()
                .comment("Repos to auto-assign to this profile"),
        )
        .field(FieldSpec::str("dhcp_tag").display_name("DHCP Tag"))
        .field(FieldSpec::list("name_servers").default(string_list(&settings.default_name_servers)))
        .field(
            FieldSpec::list("name_servers_search")
                .default(string_list(&settings.default_name_servers_search))
                .display_name("Name Servers Search Path"),
        )
        .field(mgmt_classes().inherit())
        .field(mgmt_parameters())
        .field(template_files().inherit())
        .fields(red_hat_management())
        .field(FieldSpec::bool("template_remote_kickstarts"))
        .parents(["profile", "distro"])
        .build()
}

pub fn system(settings: &CatalogSettings) -> Result<Schema> {
    SchemaBuilder::new(SYSTEM)
        .field(FieldSpec::str("name").required())
        .field(FieldSpec::list("owners"))
        .field(FieldSpec::item_ref("profile", PROFILE))
        .field(FieldSpec::item_ref("image", IMAGE))
        .requirement(require_one_of(&["profile", "image"]))
        .field(FieldSpec::map("kernel_options"))
        .field(kernel_options_post())
        .field(FieldSpec::map("kickstart_metadata"))
        .field(FieldSpec::str("kickstart").inherit())
        .field(FieldSpec::bool("netboot_enabled"))
        .field(FieldSpec::str("comment").tag("TextField"))
        .field(FieldSpec::int("depth"))
        .field(
            FieldSpec::str("server_override")
                .inherit()
                .comment("See manpage or leave blank"),
        )
        .fields(inherited_virt())
        .field(
            FieldSpec::choice("power_type", settings.power_types.clone())
                .default(first(&settings.power_types))
                .display_name("Power Management Type"),
        )
        .field(
            FieldSpec::str("power_address")
                .display_name("Power Management Address")
                .comment("Ex: power-device.example.org"),
        )
        .field(FieldSpec::str("power_user").display_name("Power Username"))
        .field(FieldSpec::str("power_pass").display_name("Power Password"))
        .field(
            FieldSpec::str("power_id")
                .display_name("Power ID")
                .comment("Usually a plug number or blade name, if power type requires it"),
        )
        .field(FieldSpec::str("hostname"))
        .field(FieldSpec::str("gateway"))
        .field(FieldSpec::list("name_servers"))
        .field(FieldSpec::list("name_servers_search").display_name("Name Servers Search Path"))
        .field(FieldSpec::str("ipv6_default_device").display_name("IPv6 Default Device"))
        .field(FieldSpec::bool("ipv6_autoconfiguration").display_name("IPv6 Autoconfiguration"))
        .field(
            FieldSpec::str("mac_address")
                .display_name("MAC Address")
                .comment("(Place \"random\" in this field for a random MAC Address.)"),
        )
        .field(FieldSpec::str("mtu").display_name("MTU"))
        .field(
            FieldSpec::choice("bonding", ["na", "master", "slave"])
                .default("na")
                .display_name("Bonding Mode"),
        )
        .field(FieldSpec::str("bonding_master"))
        .field(FieldSpec::str("bonding_opts"))
        .field(FieldSpec::bool("static").comment("Is this interface static?"))
        .field(FieldSpec::str("subnet"))
        .field(FieldSpec::str("dhcp_tag").display_name("DHCP Tag"))
        .field(FieldSpec::str("dns_name").display_name("DNS Name"))
        .field(FieldSpec::list("static_routes"))
        .field(FieldSpec::str("virt_bridge"))
        .field(FieldSpec::str("ipv6_address").display_name("IPv6 Address"))
        .field(FieldSpec::list("ipv6_secondaries").display_name("IPv6 Secondaries"))
        .field(FieldSpec::str("ipv6_mtu").display_name("IPv6 MTU"))
        .field(FieldSpec::list("ipv6_static_routes").display_name("IPv6 Static Routes"))
        .field(FieldSpec::str("ipv6_default_gateway").display_name("IPv6 Default Gateway"))
        .field(mgmt_classes())
        .field(mgmt_parameters())
        .field(template_files())
        .fields(red_hat_management())
        .field(FieldSpec::bool("template_remote_kickstarts"))
        .parents(["profile", "image"])
        .build()
}

pub fn repo(settings: &CatalogSettings) -> Result<Schema> {
    SchemaBuilder::new(REPO)
        .field(FieldSpec::str("name").required())
        .field(FieldSpec::list("owners"))
        .field(architecture(settings))
        .field(breed(settings))
        .field(
            FieldSpec::str("comment")
                .tag("TextField")
                .comment("Free form text description"),
        )
        .field(
            FieldSpec::bool("keep_updated")
                .default(true)
                .comment("Update this repo on next sync?"),
        )
        .field(FieldSpec::str("mirror").comment("Address of yum or rsync repo to mirror"))
        .field(FieldSpec::map("createrepo_flags").comment("Flags to use with createrepo"))
        .field(
            FieldSpec::map("environment")
                .comment("Use these environment variables during commands (key=value, space delimited)"),
        )
        .field(
            FieldSpec::bool("mirror_locally")
                .comment("Copy files or just reference the mirror internally?"),
        )
        .field(
            FieldSpec::int("priority")
                .default(99)
                .comment("Value for yum priorities plugin, if installed"),
        )
        .field(FieldSpec::map("yum_options").comment("Options to write to yum config file"))
        .build()
}

/// A registry holding every built-in type.
pub fn standard_registry(settings: &CatalogSettings) -> Result<Registry> {
    let mut registry = Registry::new();
    registry.register(distro(settings)?);
    registry.register(image(settings)?);
    registry.register(profile(settings)?);
    registry.register(system(settings)?);
    registry.register(repo(settings)?);
    Ok(registry)
}
